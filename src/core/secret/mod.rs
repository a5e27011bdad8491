//! Secret data model.
//!
//! A secret is a password line, optional keyed values, and a free-form body.
//! Four on-disk layouts are supported and share one capability set:
//!
//! - **AKV**: the default. Keeps the exact plaintext, insertion order, and
//!   multiple values per key.
//! - **KV**: unique lowercase keys, serialized sorted.
//! - **YAML**: password, body, then a `---` marker and a YAML mapping.
//! - **Plain**: password and body only; keyed writes are rejected.
//!
//! ## Detection
//!
//! [`Secret::parse`] picks YAML when a line that is exactly `---` follows the
//! password and the remainder parses as a mapping. Everything else is AKV.
//! KV and Plain are only produced on request via [`Secret::parse_as`].

use std::io;

use crate::error::{Result, SecretError, ValidationError};

mod akv;
mod kv;
mod plain;
mod yaml;

pub use akv::Akv;
pub use kv::Kv;
pub use plain::Plain;
pub use yaml::Yaml;

/// Separator between a key and its value.
pub(crate) const KV_SEP: &str = ": ";

/// On-disk plaintext layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Kv,
    Akv,
    Yaml,
    Plain,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Kv => "kv",
            Format::Akv => "akv",
            Format::Yaml => "yaml",
            Format::Plain => "plain",
        }
    }
}

/// A decrypted secret.
#[derive(Debug, Clone)]
pub enum Secret {
    Kv(Kv),
    Akv(Akv),
    Yaml(Yaml),
    Plain(Plain),
}

impl Default for Secret {
    fn default() -> Self {
        Secret::Akv(Akv::new())
    }
}

impl Secret {
    /// Empty AKV secret.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty KV secret. Keys are unique and serialized sorted.
    pub fn new_kv() -> Self {
        Secret::Kv(Kv::new())
    }

    /// AKV secret holding only a password.
    pub fn with_password(password: &str) -> Self {
        let mut s = Self::new();
        s.set_password(password);
        s
    }

    /// Parse plaintext, detecting the layout.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Malformed` if the plaintext is not UTF-8.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = decode(bytes)?;
        if yaml::has_marker(&text) {
            if let Ok(y) = Yaml::parse(&text) {
                return Ok(Secret::Yaml(y));
            }
        }
        Ok(Secret::Akv(Akv::parse(&text)))
    }

    /// Parse plaintext as a specific layout.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Malformed` for non-UTF-8 input and YAML errors
    /// when `format` is YAML and the document is invalid.
    pub fn parse_as(format: Format, bytes: &[u8]) -> Result<Self> {
        let text = decode(bytes)?;
        Ok(match format {
            Format::Kv => Secret::Kv(Kv::parse(&text)),
            Format::Akv => Secret::Akv(Akv::parse(&text)),
            Format::Yaml => Secret::Yaml(Yaml::parse(&text)?),
            Format::Plain => Secret::Plain(Plain::parse(&text)),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Secret::Kv(_) => Format::Kv,
            Secret::Akv(_) => Format::Akv,
            Secret::Yaml(_) => Format::Yaml,
            Secret::Plain(_) => Format::Plain,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Secret::Kv(s) => s.password(),
            Secret::Akv(s) => s.password(),
            Secret::Yaml(s) => s.password(),
            Secret::Plain(s) => s.password(),
        }
    }

    /// Replace the password. Anything after the first newline is dropped.
    pub fn set_password(&mut self, password: &str) {
        let password = first_line(password);
        match self {
            Secret::Kv(s) => s.set_password(password),
            Secret::Akv(s) => s.set_password(password),
            Secret::Yaml(s) => s.set_password(password),
            Secret::Plain(s) => s.set_password(password),
        }
    }

    /// Sorted, de-duplicated keys.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Secret::Kv(s) => s.keys(),
            Secret::Akv(s) => s.keys(),
            Secret::Yaml(s) => s.keys(),
            Secret::Plain(_) => Vec::new(),
        }
    }

    /// First value for `key`. Lookup ignores case.
    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Secret::Kv(s) => s.get(key),
            Secret::Akv(s) => s.get(key),
            Secret::Yaml(s) => s.get(key),
            Secret::Plain(_) => None,
        }
    }

    /// All values for `key`, in order.
    pub fn values(&self, key: &str) -> Option<Vec<String>> {
        match self {
            Secret::Kv(s) => s.values(key),
            Secret::Akv(s) => s.values(key),
            Secret::Yaml(s) => s.get(key).map(|v| vec![v]),
            Secret::Plain(_) => None,
        }
    }

    /// Set `key` to a single value, replacing the first existing one.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotSupported` for Plain secrets and
    /// `ValidationError::InvalidArgument` for keys or values that would not
    /// survive a round-trip.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_pair(key, value)?;
        match self {
            Secret::Kv(s) => s.set(key, value),
            Secret::Akv(s) => s.set(key, value),
            Secret::Yaml(s) => s.set(key, value),
            Secret::Plain(_) => return Err(not_supported("set", Format::Plain)),
        }
        Ok(())
    }

    /// Append another value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotSupported` for YAML and Plain secrets.
    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        validate_pair(key, value)?;
        match self {
            Secret::Kv(s) => s.add(key, value),
            Secret::Akv(s) => s.add(key, value),
            Secret::Yaml(_) => return Err(not_supported("add", Format::Yaml)),
            Secret::Plain(_) => return Err(not_supported("add", Format::Plain)),
        }
        Ok(())
    }

    /// Remove `key` and all its values. Returns whether it existed.
    pub fn del(&mut self, key: &str) -> bool {
        match self {
            Secret::Kv(s) => s.del(key),
            Secret::Akv(s) => s.del(key),
            Secret::Yaml(s) => s.del(key),
            Secret::Plain(_) => false,
        }
    }

    pub fn body(&self) -> String {
        match self {
            Secret::Kv(s) => s.body().to_string(),
            Secret::Akv(s) => s.body(),
            Secret::Yaml(s) => s.body().to_string(),
            Secret::Plain(s) => s.body().to_string(),
        }
    }

    /// Exact plaintext that goes inside the envelope.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Secret::Kv(s) => s.serialize().into_bytes(),
            Secret::Akv(s) => s.raw().as_bytes().to_vec(),
            Secret::Yaml(s) => s.serialize().into_bytes(),
            Secret::Plain(s) => s.raw().as_bytes().to_vec(),
        }
    }

    /// Append text to the secret. On an empty secret the first line becomes
    /// the password.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Malformed` if `text` is not UTF-8.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let text = decode(bytes)?;
        match self {
            Secret::Kv(s) => s.append(&text),
            Secret::Akv(s) => s.append(&text),
            Secret::Yaml(s) => s.append(&text),
            Secret::Plain(s) => s.append(&text),
        }
        Ok(())
    }

    /// Same password, same keys with the same values, same body.
    pub fn equivalent(&self, other: &Secret) -> bool {
        if self.password() != other.password() || self.body() != other.body() {
            return false;
        }
        let mut mine: Vec<String> = self.keys().iter().map(|k| k.to_lowercase()).collect();
        let mut theirs: Vec<String> = other.keys().iter().map(|k| k.to_lowercase()).collect();
        mine.sort();
        mine.dedup();
        theirs.sort();
        theirs.dedup();
        if mine != theirs {
            return false;
        }
        mine.iter().all(|k| {
            let mut a = self.values(k).unwrap_or_default();
            let mut b = other.values(k).unwrap_or_default();
            a.sort();
            b.sort();
            a == b
        })
    }
}

impl io::Write for Secret {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SecretError::Malformed(format!("not valid UTF-8: {}", e)))?;
    Ok(text.replace("\r\n", "\n"))
}

fn not_supported(op: &'static str, format: Format) -> crate::error::Error {
    SecretError::NotSupported {
        op,
        format: format.name(),
    }
    .into()
}

fn validate_pair(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() || key.contains('\n') || key.contains(KV_SEP) {
        return Err(ValidationError::InvalidArgument(format!("invalid key {:?}", key)).into());
    }
    if value.contains('\n') {
        return Err(
            ValidationError::InvalidArgument(format!("value for {} contains a newline", key))
                .into(),
        );
    }
    Ok(())
}

pub(crate) fn first_line(s: &str) -> &str {
    let line = s.split('\n').next().unwrap_or_default();
    line.strip_suffix('\r').unwrap_or(line)
}

/// Split a non-password line into a trimmed key and value.
///
/// The separator is searched on the raw line so `key: ` keeps its empty value.
pub(crate) fn split_kv(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(KV_SEP)?;
    let key = line[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[idx + KV_SEP.len()..].trim()))
}
