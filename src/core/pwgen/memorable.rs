//! Pronounceable passwords from alternating consonant and vowel groups.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{DIGITS, SYMBOLS};

const CONSONANTS: &[&str] = &[
    "b", "c", "d", "f", "g", "h", "j", "k", "l", "m", "n", "p", "r", "s", "t", "v", "w", "z",
    "br", "ch", "cl", "dr", "fl", "gr", "kr", "pl", "pr", "sh", "sl", "st", "th", "tr",
];

const VOWELS: &[&str] = &["a", "e", "i", "o", "u", "ai", "au", "ea", "ee", "ie", "oo", "ou"];

/// A pronounceable password of exactly `length` characters.
///
/// With `strict`, one letter is capitalized and the password ends in a
/// digit (plus a symbol when `symbols` is set), so it passes common
/// composition rules.
pub fn password(length: usize, symbols: bool, strict: bool) -> String {
    let mut rng = rand::thread_rng();

    let mut suffix = String::new();
    if strict && length >= 4 {
        if symbols {
            suffix.push(random_char(&mut rng, SYMBOLS));
        }
        suffix.push(random_char(&mut rng, DIGITS));
    }
    let body_len = length - suffix.len();

    let mut body = String::with_capacity(body_len + 2);
    let mut consonant = rng.gen_bool(0.5);
    while body.len() < body_len {
        let groups = if consonant { CONSONANTS } else { VOWELS };
        let group = groups.choose(&mut rng).copied().unwrap_or("a");
        body.push_str(group);
        consonant = !consonant;
    }
    body.truncate(body_len);

    if strict && body_len > 0 {
        let at = rng.gen_range(0..body_len);
        body = body
            .char_indices()
            .map(|(i, c)| if i == at { c.to_ascii_uppercase() } else { c })
            .collect();
    }
    body + &suffix
}

fn random_char(rng: &mut impl Rng, set: &str) -> char {
    let bytes = set.as_bytes();
    char::from(bytes[rng.gen_range(0..bytes.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length() {
        for len in [1, 2, 9, 24, 64] {
            let pw = password(len, false, false);
            assert_eq!(pw.len(), len);
            assert!(pw.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_strict() {
        let pw = password(16, true, true);
        assert_eq!(pw.len(), 16);
        assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
        assert!(pw.ends_with(|c: char| c.is_ascii_digit()));
        assert!(pw.chars().any(|c| SYMBOLS.contains(c)));
    }

    #[test]
    fn test_pronounceable() {
        // no group is longer than two letters, so a run of three vowels
        // needs two vowel groups in a row
        let pw = password(200, false, false);
        let vowels = |c: char| "aeiou".contains(c);
        let chars: Vec<char> = pw.chars().collect();
        let mut run = 0;
        for c in chars {
            run = if vowels(c) { run + 1 } else { 0 };
            assert!(run <= 2, "{}", pw);
        }
    }
}
