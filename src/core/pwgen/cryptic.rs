//! Random-charset passwords.

use rand::Rng;
use tracing::debug;

use super::rules::Rule;
use super::{DIGITS, LOWER, SYMBOLS, UPPER};

/// Attempts before giving up on a set of constraints.
const MAX_TRIES: usize = 128;

/// Generator for random passwords over a fixed alphabet, optionally
/// constrained to contain certain character classes.
#[derive(Debug, Clone)]
pub struct Cryptic {
    chars: Vec<char>,
    length: usize,
    required: Vec<Vec<char>>,
    max_consecutive: Option<usize>,
}

impl Cryptic {
    /// Alphanumerics, plus punctuation when `symbols` is set.
    pub fn new(length: usize, symbols: bool) -> Self {
        let mut alphabet = format!("{}{}{}", DIGITS, UPPER, LOWER);
        if symbols {
            alphabet.push_str(SYMBOLS);
        }
        Self {
            chars: alphabet.chars().collect(),
            length,
            required: Vec::new(),
            max_consecutive: None,
        }
    }

    /// Require at least one character of every class in the alphabet.
    pub fn strict(mut self) -> Self {
        for class in [DIGITS, UPPER, LOWER, SYMBOLS] {
            if class.chars().any(|c| self.chars.contains(&c)) {
                self.required.push(class.chars().collect());
            }
        }
        self
    }

    /// Clamp length and alphabet to a site's password rule.
    pub fn for_rule(length: usize, symbols: bool, rule: &Rule) -> Self {
        let mut c = Self::new(length, symbols);
        if let Some(max) = rule.maxlen.filter(|m| *m > 0) {
            c.length = c.length.min(max);
        }
        if let Some(min) = rule.minlen {
            c.length = c.length.max(min);
        }

        let alphabet = rule.alphabet();
        if !alphabet.is_empty() {
            c.chars = alphabet;
        }
        c.required = rule
            .required
            .iter()
            .map(|class| super::rules::class_chars(class))
            .filter(|chars| !chars.is_empty())
            .collect();
        c.max_consecutive = rule.max_consecutive.filter(|n| *n > 0);
        c
    }

    /// A password satisfying every constraint, or `None` after too many
    /// rejected candidates.
    pub fn password(&self) -> Option<String> {
        if self.chars.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_TRIES {
            let pw: String = (0..self.length)
                .map(|_| self.chars[rng.gen_range(0..self.chars.len())])
                .collect();
            if self.is_valid(&pw) {
                return Some(pw);
            }
        }
        debug!(length = self.length, "no password after {} tries", MAX_TRIES);
        None
    }

    fn is_valid(&self, pw: &str) -> bool {
        let classes_ok = self
            .required
            .iter()
            .all(|class| pw.chars().any(|c| class.contains(&c)));
        classes_ok
            && self
                .max_consecutive
                .map_or(true, |max| longest_run(pw) <= max)
    }
}

/// Longest run of one repeated character.
fn longest_run(pw: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;
    for c in pw.chars() {
        run = if prev == Some(c) { run + 1 } else { 1 };
        longest = longest.max(run);
        prev = Some(c);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        for len in [1, 8, 24, 80] {
            let pw = Cryptic::new(len, false).password().unwrap();
            assert_eq!(pw.chars().count(), len);
            assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_strict_has_every_class() {
        for _ in 0..20 {
            let pw = Cryptic::new(8, true).strict().password().unwrap();
            assert!(pw.chars().any(|c| c.is_ascii_digit()));
            assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
            assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
            assert!(pw.chars().any(|c| SYMBOLS.contains(c)));
        }
    }

    #[test]
    fn test_strict_too_short_fails() {
        assert!(Cryptic::new(2, true).strict().password().is_none());
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(""), 0);
        assert_eq!(longest_run("abc"), 1);
        assert_eq!(longest_run("abbbc"), 3);
    }
}
