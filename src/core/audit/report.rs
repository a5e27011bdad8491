//! Audit findings and the shared report builder.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Name of the synthetic finding added for shared passwords.
pub const DUPLICATES: &str = "duplicates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Findings for one secret, keyed by validator name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretReport {
    pub findings: BTreeMap<String, Finding>,
    /// Days since the oldest revision, if history is available.
    pub age_days: Option<i64>,
}

impl SecretReport {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Finalized audit result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub secrets: BTreeMap<String, SecretReport>,
}

impl Report {
    pub fn get(&self, name: &str) -> Option<&SecretReport> {
        self.secrets.get(name)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Inverted index: finding name to the secrets that have it.
    pub fn by_finding(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, report) in &self.secrets {
            for finding in report.findings.keys() {
                out.entry(finding.clone()).or_default().insert(name.clone());
            }
        }
        out
    }

    /// Number of secrets with at least one finding.
    pub fn flagged(&self) -> usize {
        self.secrets.values().filter(|s| s.has_findings()).count()
    }

    pub fn has_findings(&self) -> bool {
        self.flagged() > 0
    }
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, SecretReport>,
    /// SHA-256 of the password to the secrets using it.
    passwords: BTreeMap<[u8; 32], BTreeSet<String>>,
}

/// Collects results from concurrent workers behind one mutex.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    state: Mutex<State>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `name` appears in the report even without findings.
    pub fn touch(&self, name: &str) {
        self.state.lock().secrets.entry(name.to_string()).or_default();
    }

    pub fn add_finding(&self, name: &str, finding: &str, value: Finding) {
        let mut state = self.state.lock();
        state
            .secrets
            .entry(name.to_string())
            .or_default()
            .findings
            .insert(finding.to_string(), value);
    }

    pub fn set_age(&self, name: &str, days: i64) {
        let mut state = self.state.lock();
        state.secrets.entry(name.to_string()).or_default().age_days = Some(days);
    }

    /// Record a password for duplicate detection. Empty passwords are
    /// ignored.
    pub fn add_password(&self, name: &str, password: &str) {
        if password.is_empty() {
            return;
        }
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        let mut state = self.state.lock();
        state
            .passwords
            .entry(digest)
            .or_default()
            .insert(name.to_string());
        state.secrets.entry(name.to_string()).or_default();
    }

    /// Add the duplicates finding to every secret sharing a password and
    /// return the report.
    pub fn finalize(self) -> Report {
        let State {
            mut secrets,
            passwords,
        } = self.state.into_inner();

        for bucket in passwords.values().filter(|b| b.len() > 1) {
            for name in bucket {
                let others: Vec<&str> = bucket
                    .iter()
                    .filter(|n| *n != name)
                    .map(String::as_str)
                    .collect();
                secrets.entry(name.clone()).or_default().findings.insert(
                    DUPLICATES.to_string(),
                    Finding::warning(format!("password shared with {}", others.join(", "))),
                );
            }
        }
        Report { secrets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_name_each_other() {
        let builder = ReportBuilder::new();
        builder.add_password("a", "p");
        builder.add_password("b", "p");
        builder.add_password("c", "q");
        builder.add_password("d", "");
        let report = builder.finalize();

        let a = &report.get("a").unwrap().findings[DUPLICATES];
        assert_eq!(a.message, "password shared with b");
        let b = &report.get("b").unwrap().findings[DUPLICATES];
        assert_eq!(b.message, "password shared with a");
        assert!(!report.get("c").unwrap().has_findings());
        assert!(report.get("d").is_none());
        assert_eq!(report.by_finding()[DUPLICATES].len(), 2);
        assert_eq!(report.flagged(), 2);
    }

    #[test]
    fn test_three_way_duplicate() {
        let builder = ReportBuilder::new();
        for n in ["x", "y", "z"] {
            builder.add_password(n, "same");
        }
        let report = builder.finalize();
        assert_eq!(
            report.get("y").unwrap().findings[DUPLICATES].message,
            "password shared with x, z"
        );
    }

    #[test]
    fn test_findings_replace_per_validator() {
        let builder = ReportBuilder::new();
        builder.add_finding("a", "strength", Finding::warning("weak"));
        builder.add_finding("a", "strength", Finding::warning("very weak"));
        builder.set_age("a", 12);
        let report = builder.finalize();
        let a = report.get("a").unwrap();
        assert_eq!(a.findings.len(), 1);
        assert_eq!(a.findings["strength"].message, "very weak");
        assert_eq!(a.age_days, Some(12));
    }
}
