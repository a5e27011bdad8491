//! Known configuration keys with their types and defaults.

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Bool,
    Int,
    String,
}

#[derive(Debug, Clone, Copy)]
pub struct KnownKey {
    /// Dotted key. `*` matches one alias segment.
    pub key: &'static str,
    pub kind: KeyType,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

pub const KNOWN_KEYS: &[KnownKey] = &[
    KnownKey {
        key: "core.autosync",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Push after every commit",
    },
    KnownKey {
        key: "core.autopush",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Allow pushes during autosync",
    },
    KnownKey {
        key: "core.autoimport",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Import missing recipient keys on decrypt failure",
    },
    KnownKey {
        key: "core.cliptimeout",
        kind: KeyType::Int,
        default: Some("45"),
        description: "Clipboard TTL in seconds",
    },
    KnownKey {
        key: "core.exportkeys",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Export recipient public keys into the store",
    },
    KnownKey {
        key: "core.follow-references",
        kind: KeyType::Bool,
        default: Some("false"),
        description: "Resolve ref: values recursively",
    },
    KnownKey {
        key: "core.notifications",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Emit desktop notifications",
    },
    KnownKey {
        key: "core.nopager",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Skip the pager for list output",
    },
    KnownKey {
        key: "show.safecontent",
        kind: KeyType::Bool,
        default: Some("false"),
        description: "Hide the password line on show unless forced",
    },
    KnownKey {
        key: "show.parsing",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Parse structured secrets on show",
    },
    KnownKey {
        key: "audit.concurrency",
        kind: KeyType::Int,
        default: None,
        description: "Audit worker count (defaults to the backend hint)",
    },
    KnownKey {
        key: "audit.hibp-endpoint",
        kind: KeyType::String,
        default: Some("https://api.pwnedpasswords.com/range/"),
        description: "k-anonymity range endpoint for breach lookups",
    },
    KnownKey {
        key: "generate.autoclip",
        kind: KeyType::Bool,
        default: Some("true"),
        description: "Copy generated passwords to the clipboard",
    },
    KnownKey {
        key: "generate.length",
        kind: KeyType::Int,
        default: None,
        description: "Default generated password length",
    },
    KnownKey {
        key: "generate.symbols",
        kind: KeyType::Bool,
        default: Some("false"),
        description: "Include punctuation in generated passwords",
    },
    KnownKey {
        key: "generate.strict",
        kind: KeyType::Bool,
        default: Some("false"),
        description: "Require every character class in generated passwords",
    },
    KnownKey {
        key: "pwgen.xkcd-lang",
        kind: KeyType::String,
        default: Some("en"),
        description: "Wordlist language for xkcd passwords",
    },
    KnownKey {
        key: "age.keyring",
        kind: KeyType::String,
        default: None,
        description: "Directory holding age identities and known recipients",
    },
    KnownKey {
        key: "mounts.path",
        kind: KeyType::String,
        default: None,
        description: "Root store path",
    },
    KnownKey {
        key: "mounts.*.path",
        kind: KeyType::String,
        default: None,
        description: "Sub-store path",
    },
    KnownKey {
        key: "mounts.*.crypto",
        kind: KeyType::String,
        default: None,
        description: "Crypto backend override for a mount",
    },
    KnownKey {
        key: "mounts.*.storage",
        kind: KeyType::String,
        default: None,
        description: "Storage backend override for a mount",
    },
    KnownKey {
        key: "recipients.hash.*",
        kind: KeyType::String,
        default: None,
        description: "Recipient list checksum for drift detection",
    },
];

/// Find the table entry matching `key`.
pub fn lookup(key: &str) -> Option<&'static KnownKey> {
    KNOWN_KEYS.iter().find(|k| matches(k.key, key))
}

fn matches(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == key,
        Some((head, tail)) => {
            key.len() > head.len() + tail.len()
                && key.starts_with(head)
                && key.ends_with(tail)
        }
    }
}

/// Check that `value` fits the declared type of `key`.
///
/// # Errors
///
/// Returns `ConfigError::UnknownKey` for keys outside the table and
/// `ConfigError::InvalidValue` for type mismatches.
pub fn validate(key: &str, value: &str) -> Result<()> {
    let known = lookup(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let ok = match known.kind {
        KeyType::Bool => parse_bool(value).is_some(),
        KeyType::Int => value.trim().parse::<i64>().is_ok(),
        KeyType::String => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
        .into())
    }
}

/// Git-style boolean parsing.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}
