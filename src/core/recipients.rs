//! Recipient list file handling.
//!
//! The list is stored one identifier per line with a trailing newline.
//! Comment lines (`#`) are carried through unchanged; identifiers keep their
//! case and insertion order and are de-duplicated case-insensitively.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Comment(String),
    Id(String),
}

/// Ordered, de-duplicated recipient list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    lines: Vec<Line>,
}

impl Recipients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the on-disk recipient file. Blank lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut r = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                r.lines.push(Line::Comment(line.to_string()));
            } else {
                // inline comments after an id are not part of it
                let id = line.split_once(" #").map_or(line, |(id, _)| id).trim();
                r.add(id);
            }
        }
        r
    }

    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut r = Self::new();
        for id in ids {
            r.add(id.as_ref());
        }
        r
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                Line::Id(id) => Some(id.clone()),
                Line::Comment(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, Line::Id(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| matches!(l, Line::Id(x) if x.eq_ignore_ascii_case(id)))
    }

    /// Append `id`. Returns false if it was already present.
    pub fn add(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.lines.push(Line::Id(id.to_string()));
        true
    }

    /// Remove `id`. Returns false if it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.lines.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Canonical file content.
    pub fn marshal(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Comment(c) => out.push_str(c),
                Line::Id(id) => out.push_str(id),
            }
            out.push('\n');
        }
        out
    }

    /// SHA-256 of the canonical content, hex encoded.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.marshal().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_comments_and_order() {
        let r = Recipients::parse("# team\nbob\nalice\n\nBOB\n");
        assert_eq!(r.ids(), vec!["bob", "alice"]);
        assert_eq!(r.marshal(), "# team\nbob\nalice\n");
    }

    #[test]
    fn test_inline_comment_stripped() {
        let r = Recipients::parse("age1abc # laptop\n");
        assert_eq!(r.ids(), vec!["age1abc"]);
    }

    #[test]
    fn test_add_remove() {
        let mut r = Recipients::from_ids(&["x"]);
        assert!(r.add("y"));
        assert!(!r.add("Y"));
        assert_eq!(r.len(), 2);
        assert!(r.remove("x"));
        assert!(!r.remove("x"));
        assert_eq!(r.marshal(), "y\n");
    }

    #[test]
    fn test_hash_stable_and_sensitive() {
        let a = Recipients::from_ids(&["x", "y"]);
        let b = Recipients::parse("x\ny\n");
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        let c = Recipients::from_ids(&["y", "x"]);
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_empty() {
        let r = Recipients::parse("# only comments\n");
        assert!(r.is_empty());
    }
}
