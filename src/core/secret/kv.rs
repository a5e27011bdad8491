//! Key-value secrets with unique lowercase keys.

use std::collections::BTreeMap;

use zeroize::Zeroize;

use super::split_kv;

#[derive(Debug, Clone, Default)]
pub struct Kv {
    password: String,
    data: BTreeMap<String, Vec<String>>,
    body: String,
}

impl Drop for Kv {
    fn drop(&mut self) {
        self.password.zeroize();
        self.body.zeroize();
        for values in self.data.values_mut() {
            values.iter_mut().for_each(|v| v.zeroize());
        }
    }
}

impl Kv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut kv = Self::new();
        let mut lines = text.lines();
        kv.password = lines.next().unwrap_or_default().trim().to_string();
        for line in lines {
            match split_kv(line) {
                Some((k, v)) => kv
                    .data
                    .entry(k.to_lowercase())
                    .or_default()
                    .push(v.to_string()),
                None => {
                    kv.body.push_str(line);
                    kv.body.push('\n');
                }
            }
        }
        kv
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: &str) {
        self.password.zeroize();
        self.password = password.to_string();
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data
            .get(&key.to_lowercase())
            .and_then(|v| v.first())
            .cloned()
    }

    pub fn values(&self, key: &str) -> Option<Vec<String>> {
        self.data.get(&key.to_lowercase()).cloned()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.data
            .insert(key.to_lowercase(), vec![value.to_string()]);
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.data
            .entry(key.to_lowercase())
            .or_default()
            .push(value.to_string());
    }

    pub fn del(&mut self, key: &str) -> bool {
        self.data.remove(&key.to_lowercase()).is_some()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Appended text joins the body; on an empty secret its first line is the password.
    pub fn append(&mut self, text: &str) {
        if self.password.is_empty() && self.data.is_empty() && self.body.is_empty() {
            *self = Kv::parse(text);
            return;
        }
        self.body.push_str(text);
    }

    /// Password, sorted pairs, then body.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.password);
        out.push('\n');
        for (k, values) in &self.data {
            for v in values {
                out.push_str(&format!("{}: {}\n", k, v));
            }
        }
        out.push_str(&self.body);
        out
    }
}
