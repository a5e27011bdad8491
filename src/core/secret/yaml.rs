//! YAML secrets: password, free body, `---`, then a YAML mapping.

use serde_yaml::{Mapping, Value};
use zeroize::Zeroize;

use crate::error::{Result, SecretError};

const MARKER: &str = "---";

#[derive(Debug, Clone, Default)]
pub struct Yaml {
    password: String,
    body: String,
    data: Mapping,
    /// Parsed text, kept until the first mutation.
    raw: Option<String>,
}

impl Drop for Yaml {
    fn drop(&mut self) {
        self.password.zeroize();
        self.body.zeroize();
        if let Some(raw) = self.raw.as_mut() {
            raw.zeroize();
        }
    }
}

/// True if some line after the password is exactly `---`.
pub(crate) fn has_marker(text: &str) -> bool {
    text.lines().skip(1).any(|l| l.trim_end() == MARKER)
}

impl Yaml {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.split_inclusive('\n');
        let password = lines
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let mut body = String::new();
        let mut doc = String::new();
        let mut in_doc = false;
        for line in lines {
            if in_doc {
                doc.push_str(line);
            } else if line.trim_end() == MARKER {
                in_doc = true;
            } else {
                body.push_str(line);
            }
        }
        if !in_doc {
            return Err(SecretError::Malformed("no YAML marker".into()).into());
        }

        let data = match serde_yaml::from_str::<Value>(&doc).map_err(SecretError::from)? {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => {
                return Err(
                    SecretError::Malformed("YAML document is not a mapping".into()).into(),
                )
            }
        };

        Ok(Self {
            password,
            body,
            data,
            raw: Some(text.to_string()),
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: &str) {
        self.password.zeroize();
        self.password = password.to_string();
        self.touch();
    }

    fn find(&self, key: &str) -> Option<(&Value, &Value)> {
        self.data
            .iter()
            .find(|(k, _)| k.as_str().is_some_and(|k| k.eq_ignore_ascii_case(key)))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.find(key).map(|(_, v)| scalar(v))
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let existing = self.find(key).map(|(k, _)| k.clone());
        let k = existing.unwrap_or_else(|| Value::String(key.to_string()));
        self.data.insert(k, Value::String(value.to_string()));
        self.touch();
    }

    pub fn del(&mut self, key: &str) -> bool {
        let existing = self.find(key).map(|(k, _)| k.clone());
        match existing {
            Some(k) => {
                self.data.remove(&k);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn append(&mut self, text: &str) {
        self.body.push_str(text);
        self.touch();
    }

    pub fn serialize(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut out = String::new();
        out.push_str(&self.password);
        out.push('\n');
        out.push_str(&self.body);
        if !self.body.is_empty() && !self.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(MARKER);
        out.push('\n');
        if !self.data.is_empty() {
            // mapping of plain values always serializes
            out.push_str(&serde_yaml::to_string(&self.data).unwrap_or_default());
        }
        out
    }

    fn touch(&mut self) {
        if let Some(mut raw) = self.raw.take() {
            raw.zeroize();
        }
    }
}

fn scalar(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_roundtrip_is_exact() {
        let input = "pw\nsome notes\n---\nuser:   bob\n# comment\nport: 22\n";
        let y = Yaml::parse(input).unwrap();
        assert_eq!(y.serialize(), input);
    }

    #[test]
    fn test_mutation_reserializes() {
        let mut y = Yaml::parse("pw\n---\nuser: bob\n").unwrap();
        y.set("USER", "alice");
        assert_eq!(y.get("user").as_deref(), Some("alice"));
        assert_eq!(y.serialize(), "pw\n---\nuser: alice\n");

        let again = Yaml::parse(&y.serialize()).unwrap();
        assert_eq!(again.get("user").as_deref(), Some("alice"));
    }

    #[test]
    fn test_nested_values_render_as_yaml() {
        let y = Yaml::parse("pw\n---\nlist:\n- a\n- b\n").unwrap();
        assert_eq!(y.get("list").as_deref(), Some("- a\n- b"));
    }

    #[test]
    fn test_del() {
        let mut y = Yaml::parse("pw\n---\na: 1\nb: 2\n").unwrap();
        assert!(y.del("A"));
        assert!(!y.del("a"));
        assert_eq!(y.keys(), vec!["b"]);
    }

    #[test]
    fn test_missing_marker_is_error() {
        assert!(Yaml::parse("pw\nuser: bob\n").is_err());
    }

    #[test]
    fn test_invalid_document_is_format_error() {
        let err = Yaml::parse("pw\n---\nkey: [unclosed\n").unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Secret(SecretError::Yaml(_))
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::FormatError);
    }
}
