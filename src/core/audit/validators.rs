//! Per-secret password checks.

use std::collections::BTreeSet;

use crate::core::context::Context;
use crate::core::secret::Secret;

use super::report::Finding;

/// A check run against every audited secret.
pub trait Validator: Send + Sync {
    /// Finding name in the report.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &Context, name: &str, secret: &Secret) -> Option<Finding>;
}

/// Validators enabled by default, in report order.
pub fn defaults() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(Dictionary::default()),
        Box::new(Strength),
        Box::new(NameEquals),
    ]
}

// --- Dictionary ---

const COMMON: &[&str] = &[
    "123456", "123456789", "12345678", "password", "qwerty", "qwertyuiop", "111111",
    "1234567", "iloveyou", "admin", "welcome", "monkey", "login", "abc123", "starwars",
    "dragon", "passw0rd", "master", "hello", "freedom", "whatever", "qazwsx", "trustno1",
    "letmein", "football", "baseball", "sunshine", "princess", "shadow", "superman",
    "michael", "charlie", "donald", "mustang", "secret", "access", "batman", "zaq1zaq1",
    "654321", "jennifer", "hunter2", "changeme", "default", "root", "toor", "test",
    "guest", "pass", "summer", "winter",
];

/// Rule-based weakness checks: length, variety, keyboard patterns and
/// well-known passwords.
#[derive(Debug, Clone)]
pub struct Dictionary {
    pub min_length: usize,
    pub min_distinct: usize,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            min_length: 6,
            min_distinct: 5,
        }
    }
}

impl Dictionary {
    fn weakness(&self, password: &str) -> Option<&'static str> {
        let chars: Vec<char> = password.chars().collect();
        if chars.len() < self.min_length {
            return Some("password is too short");
        }
        let distinct: BTreeSet<char> = chars.iter().copied().collect();
        if distinct.len() < self.min_distinct {
            return Some("password is too simple: too few distinct characters");
        }
        if is_systematic(&chars) {
            return Some("password is too systematic");
        }

        let lower = password.to_lowercase();
        let reversed: String = lower.chars().rev().collect();
        if COMMON.contains(&lower.as_str()) || COMMON.contains(&reversed.as_str()) {
            return Some("password is a common password");
        }
        let stem = lower.trim_end_matches(|c: char| !c.is_alphabetic());
        let stem = stem.trim_start_matches(|c: char| !c.is_alphabetic());
        if stem.len() >= 4 && COMMON.contains(&stem) {
            return Some("password is based on a common password");
        }
        None
    }
}

/// Runs of constant step, like `abcdef`, `13579` or `zyxw`.
fn is_systematic(chars: &[char]) -> bool {
    if chars.len() < 3 {
        return false;
    }
    let step = chars[1] as i64 - chars[0] as i64;
    chars
        .windows(2)
        .all(|w| w[1] as i64 - w[0] as i64 == step)
}

impl Validator for Dictionary {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn check(&self, _ctx: &Context, _name: &str, secret: &Secret) -> Option<Finding> {
        self.weakness(&secret.password()).map(Finding::warning)
    }
}

// --- Strength ---

/// zxcvbn score with the secret name and its other values as user inputs.
#[derive(Debug, Clone, Copy)]
pub struct Strength;

/// Scores below this warn.
const MIN_SCORE: u8 = 3;

impl Validator for Strength {
    fn name(&self) -> &'static str {
        "strength"
    }

    fn check(&self, _ctx: &Context, name: &str, secret: &Secret) -> Option<Finding> {
        let password = secret.password();
        let mut inputs: Vec<String> = name
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        for key in secret.keys() {
            inputs.extend(secret.values(&key).unwrap_or_default());
        }
        let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();

        let entropy = zxcvbn::zxcvbn(&password, &inputs).ok()?;
        let score = entropy.score();
        (score < MIN_SCORE).then(|| Finding::warning(format!("password is weak (score {}/4)", score)))
    }
}

// --- Name ---

/// Error when the password is the secret's name or its last segment.
#[derive(Debug, Clone, Copy)]
pub struct NameEquals;

impl Validator for NameEquals {
    fn name(&self) -> &'static str {
        "name"
    }

    fn check(&self, _ctx: &Context, name: &str, secret: &Secret) -> Option<Finding> {
        let password = secret.password();
        let base = name.rsplit('/').next().unwrap_or(name);
        (password.eq_ignore_ascii_case(name) || password.eq_ignore_ascii_case(base))
            .then(|| Finding::error("password equals the secret name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(v: &dyn Validator, name: &str, pw: &str) -> Option<Finding> {
        v.check(&Context::new(), name, &Secret::with_password(pw))
    }

    #[test]
    fn test_dictionary_rules() {
        let d = Dictionary::default();
        let msg = |pw: &str| check(&d, "x", pw).map(|f| f.message);
        assert_eq!(msg("abc").as_deref(), Some("password is too short"));
        assert_eq!(
            msg("aaaabbbb").as_deref(),
            Some("password is too simple: too few distinct characters")
        );
        assert_eq!(msg("abcdefgh").as_deref(), Some("password is too systematic"));
        assert_eq!(msg("qwertyuiop").as_deref(), Some("password is a common password"));
        assert_eq!(msg("drowssap").as_deref(), Some("password is a common password"));
        assert_eq!(msg("Sunshine2024!").as_deref(), Some("password is based on a common password"));
        assert_eq!(msg("k7#Lp2!vQz9@"), None);
    }

    #[test]
    fn test_strength_uses_name_as_input() {
        assert!(check(&Strength, "x", "password1").is_some());
        assert!(check(&Strength, "x", "x9#Tq!7vLm2@Rz").is_none());
        // empty passwords are not scored
        assert!(check(&Strength, "x", "").is_none());
    }

    #[test]
    fn test_name_equals() {
        let f = check(&NameEquals, "web/github", "GitHub").unwrap();
        assert_eq!(f.severity, super::super::report::Severity::Error);
        assert!(check(&NameEquals, "web/github", "other").is_none());
    }
}
