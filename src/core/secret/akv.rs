//! Append-only key-value secrets.
//!
//! The raw plaintext is the single source of truth; password, keys, and body
//! are derived from it on demand so an untouched secret serializes to exactly
//! the bytes it was parsed from.

use zeroize::Zeroize;

use super::split_kv;

#[derive(Debug, Clone, Default)]
pub struct Akv {
    raw: String,
}

impl Drop for Akv {
    fn drop(&mut self) {
        self.raw.zeroize();
    }
}

impl Akv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        Self {
            raw: text.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn password(&self) -> &str {
        self.raw.split('\n').next().unwrap_or_default().trim()
    }

    pub fn set_password(&mut self, password: &str) {
        let rest = self.raw.split_once('\n').map(|(_, rest)| rest.to_string());
        let mut raw = String::with_capacity(self.raw.len() + password.len());
        raw.push_str(password);
        match rest {
            Some(rest) => {
                raw.push('\n');
                raw.push_str(&rest);
            }
            None if self.raw.is_empty() => raw.push('\n'),
            None => {}
        }
        self.replace_raw(raw);
    }

    /// Keyed lines after the password, in file order, with original key case.
    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw.lines().skip(1).filter_map(split_kv)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for (k, _) in self.pairs() {
            if !keys.iter().any(|seen| seen.eq_ignore_ascii_case(k)) {
                keys.push(k.to_string());
            }
        }
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.to_string())
    }

    pub fn values(&self, key: &str) -> Option<Vec<String>> {
        let values: Vec<String> = self
            .pairs()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.to_string())
            .collect();
        (!values.is_empty()).then_some(values)
    }

    /// Update the first occurrence of `key`, or append it.
    pub fn set(&mut self, key: &str, value: &str) {
        if self.get(key).is_none() {
            self.add(key, value);
            return;
        }

        let mut out = String::with_capacity(self.raw.len());
        let mut written = false;
        for (i, line) in self.raw.split_inclusive('\n').enumerate() {
            if i > 0 && !written {
                if let Some((k, _)) = split_kv(line.trim_end_matches('\n')) {
                    if k.eq_ignore_ascii_case(key) {
                        out.push_str(&format!("{}: {}", k, value));
                        if line.ends_with('\n') {
                            out.push('\n');
                        }
                        written = true;
                        continue;
                    }
                }
            }
            out.push_str(line);
        }
        self.replace_raw(out);
    }

    pub fn add(&mut self, key: &str, value: &str) {
        // an empty buffer gets a blank password line first
        if !self.raw.ends_with('\n') {
            self.raw.push('\n');
        }
        self.raw.push_str(&format!("{}: {}\n", key, value));
    }

    pub fn del(&mut self, key: &str) -> bool {
        let mut found = false;
        let mut out = String::with_capacity(self.raw.len());
        for (i, line) in self.raw.split_inclusive('\n').enumerate() {
            if i > 0 {
                if let Some((k, _)) = split_kv(line.trim_end_matches('\n')) {
                    if k.eq_ignore_ascii_case(key) {
                        found = true;
                        continue;
                    }
                }
            }
            out.push_str(line);
        }
        if found {
            self.replace_raw(out);
        }
        found
    }

    pub fn body(&self) -> String {
        let mut body = String::new();
        for line in self.raw.lines().skip(1) {
            if split_kv(line).is_some() {
                continue;
            }
            body.push_str(line);
            body.push('\n');
        }
        body
    }

    pub fn append(&mut self, text: &str) {
        self.raw.push_str(text);
    }

    fn replace_raw(&mut self, raw: String) {
        self.raw.zeroize();
        self.raw = raw;
    }
}
