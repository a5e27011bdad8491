//! Minimal git-config syntax reader and writer.
//!
//! Supports `[section]`, `[section "sub"]`, `key = value`, bare boolean
//! keys, `#`/`;` comments, and double-quoted values with `\"`, `\\`, `\n`,
//! `\t` escapes. Lines the writer does not touch are kept verbatim.

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone)]
struct RawLine {
    text: String,
    /// Full dotted key and value for variable lines.
    entry: Option<(String, String)>,
    /// Section prefix for header lines, e.g. `mounts.team`.
    header: Option<String>,
}

/// One git-config file held in memory.
#[derive(Debug, Clone, Default)]
pub struct GitConfig {
    lines: Vec<RawLine>,
}

impl GitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file content. `origin` names the file in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut cfg = Self::new();
        let mut section: Option<String> = None;

        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            let err = |message: &str| ConfigError::Parse {
                path: origin.to_string(),
                line: idx + 1,
                message: message.to_string(),
            };

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                cfg.lines.push(RawLine {
                    text: line.to_string(),
                    entry: None,
                    header: None,
                });
                continue;
            }

            if trimmed.starts_with('[') {
                let prefix = parse_header(trimmed).ok_or_else(|| err("invalid section header"))?;
                section = Some(prefix.clone());
                cfg.lines.push(RawLine {
                    text: line.to_string(),
                    entry: None,
                    header: Some(prefix),
                });
                continue;
            }

            let prefix = section
                .as_ref()
                .ok_or_else(|| err("variable outside of a section"))?;
            let (name, value) = match trimmed.split_once('=') {
                Some((n, v)) => (n.trim(), parse_value(v).map_err(|m| err(&m))?),
                None => (trimmed, "true".to_string()),
            };
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(err("invalid variable name").into());
            }
            cfg.lines.push(RawLine {
                text: line.to_string(),
                entry: Some((format!("{}.{}", prefix, name), value)),
                header: None,
            });
        }

        Ok(cfg)
    }

    /// Last value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .last()
            .map(|(_, v)| v)
    }

    /// All values for `key`, in file order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// All `(key, value)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines
            .iter()
            .filter_map(|l| l.entry.as_ref().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Set `key` to `value`, rewriting the last existing line or appending to
    /// the matching section.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (prefix, name) = split_key(key)?;
        let text = format!("\t{} = {}", name, quote(value));
        let entry = Some((key.to_string(), value.to_string()));

        if let Some(idx) = self
            .lines
            .iter()
            .rposition(|l| matches!(&l.entry, Some((k, _)) if k == key))
        {
            self.lines[idx] = RawLine {
                text,
                entry,
                header: None,
            };
            return Ok(());
        }

        // insert after the last line belonging to the section
        let mut insert_at = None;
        let mut current: Option<&str> = None;
        for (idx, line) in self.lines.iter().enumerate() {
            if let Some(h) = &line.header {
                current = Some(h.as_str());
            }
            if current == Some(prefix) && (line.header.is_some() || line.entry.is_some()) {
                insert_at = Some(idx + 1);
            }
        }

        let new_line = RawLine {
            text,
            entry,
            header: None,
        };
        match insert_at {
            Some(idx) => self.lines.insert(idx, new_line),
            None => {
                self.lines.push(RawLine {
                    text: header_text(prefix),
                    entry: None,
                    header: Some(prefix.to_string()),
                });
                self.lines.push(new_line);
            }
        }
        Ok(())
    }

    /// Remove every line for `key`. Returns whether anything was removed.
    pub fn unset(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|l| !matches!(&l.entry, Some((k, _)) if k == key));
        before != self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

/// Split `section.sub.name` into (`section.sub`, `name`).
fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.rsplit_once('.') {
        Some((prefix, name)) if !prefix.is_empty() && !name.is_empty() => Ok((prefix, name)),
        _ => Err(ConfigError::UnknownKey(key.to_string()).into()),
    }
}

fn header_text(prefix: &str) -> String {
    match prefix.split_once('.') {
        Some((section, sub)) => format!("[{} \"{}\"]", section, sub.replace('"', "\\\"")),
        None => format!("[{}]", prefix),
    }
}

fn parse_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?;
    let end = inner.rfind(']')?;
    let inner = inner[..end].trim();
    match inner.split_once(char::is_whitespace) {
        Some((section, sub)) => {
            let sub = sub.trim();
            let sub = sub.strip_prefix('"')?.strip_suffix('"')?;
            Some(format!(
                "{}.{}",
                section.to_lowercase(),
                sub.replace("\\\"", "\"").replace("\\\\", "\\")
            ))
        }
        None if !inner.is_empty() => {
            // legacy [section.sub] form
            let (section, sub) = match inner.split_once('.') {
                Some((s, sub)) => (s, Some(sub)),
                None => (inner, None),
            };
            Some(match sub {
                Some(sub) => format!("{}.{}", section.to_lowercase(), sub),
                None => section.to_lowercase(),
            })
        }
        None => None,
    }
}

fn parse_value(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = raw.trim().chars().peekable();
    let mut pending_space = String::new();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' => {
                let escaped = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some(other) => return Err(format!("invalid escape \\{}", other)),
                    None => return Err("trailing backslash".into()),
                };
                out.push_str(&pending_space);
                pending_space.clear();
                out.push(escaped);
            }
            '#' | ';' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => pending_space.push(c),
            c => {
                out.push_str(&pending_space);
                pending_space.clear();
                out.push(c);
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".into());
    }
    Ok(out)
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value != value.trim()
        || value.contains(['#', ';', '"', '\\', '\n', '\t']);
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# gpass config\n[core]\n\tautosync = false\n\tnopager\n[mounts \"team\"]\n\tpath = /srv/team ; shared\n";

    #[test]
    fn test_parse_sections_and_bare_keys() {
        let cfg = GitConfig::parse(SAMPLE, "test").unwrap();
        assert_eq!(cfg.get("core.autosync"), Some("false"));
        assert_eq!(cfg.get("core.nopager"), Some("true"));
        assert_eq!(cfg.get("mounts.team.path"), Some("/srv/team"));
    }

    #[test]
    fn test_untouched_serialization_is_verbatim() {
        let cfg = GitConfig::parse(SAMPLE, "test").unwrap();
        assert_eq!(cfg.serialize(), SAMPLE);
    }

    #[test]
    fn test_set_existing_and_new() {
        let mut cfg = GitConfig::parse(SAMPLE, "test").unwrap();
        cfg.set("core.autosync", "true").unwrap();
        cfg.set("core.cliptimeout", "10").unwrap();
        cfg.set("recipients.hash.team/ops", "abc").unwrap();

        let text = cfg.serialize();
        assert!(text.starts_with("# gpass config\n"));
        assert!(text.contains("[recipients \"hash\"]\n\tteam/ops = abc\n"));

        let again = GitConfig::parse(&text, "test").unwrap();
        assert_eq!(again.get("core.autosync"), Some("true"));
        assert_eq!(again.get("core.cliptimeout"), Some("10"));
        assert_eq!(again.get("recipients.hash.team/ops"), Some("abc"));
        assert_eq!(again.get("mounts.team.path"), Some("/srv/team"));
    }

    #[test]
    fn test_dotted_subsection_roundtrip() {
        let mut cfg = GitConfig::new();
        cfg.set("mounts.my.store.path", "/x").unwrap();
        let again = GitConfig::parse(&cfg.serialize(), "test").unwrap();
        assert_eq!(again.get("mounts.my.store.path"), Some("/x"));
    }

    #[test]
    fn test_quoted_values() {
        let mut cfg = GitConfig::new();
        cfg.set("core.name", " spaced # hash \"q\"").unwrap();
        let again = GitConfig::parse(&cfg.serialize(), "test").unwrap();
        assert_eq!(again.get("core.name"), Some(" spaced # hash \"q\""));
    }

    #[test]
    fn test_unset() {
        let mut cfg = GitConfig::parse(SAMPLE, "test").unwrap();
        assert!(cfg.unset("core.autosync"));
        assert!(!cfg.unset("core.autosync"));
        assert_eq!(cfg.get("core.autosync"), None);
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = GitConfig::parse("key = value\n", "cfg").unwrap_err();
        assert!(err.to_string().contains("cfg:1"));

        let err = GitConfig::parse("[core]\n\tname = \"open\n", "cfg").unwrap_err();
        assert!(err.to_string().contains("cfg:2"));
    }
}
