//! Per-site password rules.
//!
//! Rules are keyed by registrable domain and loaded from TOML. A built-in
//! table ships with the binary.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{DIGITS, LOWER, SYMBOLS, UPPER};
use crate::error::{Result, ValidationError};

const BUILTIN: &str = include_str!("rules.toml");

/// Constraints one site places on passwords.
///
/// Classes are `lower`, `upper`, `digit`, `special`, or a literal set in
/// brackets such as `[-_.]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rule {
    pub minlen: Option<usize>,
    pub maxlen: Option<usize>,
    /// At least one character from each.
    pub required: Vec<String>,
    /// Usable but not required.
    pub allowed: Vec<String>,
    pub max_consecutive: Option<usize>,
}

impl Rule {
    /// Every character the rule permits, sorted and deduplicated.
    pub fn alphabet(&self) -> Vec<char> {
        let mut chars: Vec<char> = self
            .required
            .iter()
            .chain(&self.allowed)
            .flat_map(|class| class_chars(class))
            .collect();
        chars.sort_unstable();
        chars.dedup();
        chars
    }
}

/// Characters of one rule class. Unknown class names yield nothing.
pub(crate) fn class_chars(class: &str) -> Vec<char> {
    match class {
        "lower" => LOWER.chars().collect(),
        "upper" => UPPER.chars().collect(),
        "digit" => DIGITS.chars().collect(),
        "special" => SYMBOLS.chars().collect(),
        other => other
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .map(|s| s.chars().collect())
            .unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    rules: BTreeMap<String, Rule>,
}

/// Rule table with domain aliases.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    aliases: BTreeMap<String, String>,
    rules: BTreeMap<String, Rule>,
}

impl Rules {
    /// Rules shipped with gpass.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidArgument` if the embedded table is
    /// malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: RulesFile = toml::from_str(text)
            .map_err(|e| ValidationError::InvalidArgument(format!("password rules: {}", e)))?;
        Ok(Self {
            aliases: file.aliases,
            rules: file.rules,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule for `domain` or its nearest parent domain. A leading `www.` and
    /// aliases are resolved first.
    pub fn lookup(&self, domain: &str) -> Option<&Rule> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = domain.strip_prefix("www.").unwrap_or(&domain);
        loop {
            let key = self.aliases.get(candidate).map_or(candidate, String::as_str);
            if let Some(rule) = self.rules.get(key) {
                return Some(rule);
            }
            // stop before the bare top-level domain
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return None,
            }
        }
    }
}

/// The first path segment that looks like a host name, e.g. `example.com`
/// in `websites/example.com/user`.
pub fn domain_of(name: &str) -> Option<&str> {
    name.split('/').find(|seg| {
        let labels: Vec<&str> = seg.split('.').collect();
        labels.len() >= 2
            && labels.iter().all(|l| {
                !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
            && labels
                .last()
                .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()))
    })
}
