//! Password audit.
//!
//! A bounded pool of workers pulls secret names from a channel, decrypts
//! each secret once, runs every [`Validator`] on it and records findings in
//! a shared [`ReportBuilder`]. Duplicate detection runs after all workers
//! have joined.

mod hibp;
mod render;
mod report;
mod validators;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use chrono::Utc;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::context::Context;
use crate::core::root::RootStore;
use crate::core::secret::Secret;
use crate::core::types::Revision;
use crate::error::{Result, ValidationError};

pub use hibp::{Breach, HttpRange, RangeLookup};
pub use render::ReportFormat;
pub use report::{Finding, Report, ReportBuilder, SecretReport, Severity, DUPLICATES};
pub use validators::{Dictionary, NameEquals, Strength, Validator};

/// Secrets older than this get an `age` warning.
const MAX_AGE_DAYS: i64 = 365;

/// What the audit reads secrets through.
pub trait SecretSource: Sync {
    fn get(&self, ctx: &Context, name: &str) -> Result<Secret>;

    fn revisions(&self, ctx: &Context, name: &str) -> Result<Vec<Revision>>;

    /// Parallelism the crypto backends tolerate.
    fn concurrency(&self) -> usize {
        1
    }
}

impl SecretSource for RootStore {
    fn get(&self, ctx: &Context, name: &str) -> Result<Secret> {
        RootStore::get(self, ctx, name)
    }

    fn revisions(&self, ctx: &Context, name: &str) -> Result<Vec<Revision>> {
        RootStore::revisions(self, ctx, name)
    }

    fn concurrency(&self) -> usize {
        self.mounts()
            .iter()
            .filter_map(|(alias, _)| self.store(alias).ok())
            .map(|s| s.cipher().concurrency())
            .min()
            .unwrap_or(1)
    }
}

/// Configured audit run.
pub struct Auditor {
    validators: Vec<Box<dyn Validator>>,
    excludes: Vec<Regex>,
    concurrency: Option<usize>,
}

impl Default for Auditor {
    fn default() -> Self {
        Self {
            validators: validators::defaults(),
            excludes: Vec::new(),
            concurrency: None,
        }
    }
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default validators plus settings from config: `audit.concurrency`
    /// caps the worker count.
    pub fn from_config(config: &Config) -> Self {
        let mut auditor = Self::new();
        if let Some(n) = config.get_int("audit.concurrency").filter(|n| *n > 0) {
            auditor.concurrency = Some(n as usize);
        }
        auditor
    }

    /// Enable the breach lookup against `audit.hibp-endpoint`.
    pub fn with_breach_lookup(self, config: &Config) -> Self {
        let endpoint = config
            .get("audit.hibp-endpoint")
            .unwrap_or_else(|| "https://api.pwnedpasswords.com/range/".to_string());
        self.with_validator(Box::new(Breach::new(Box::new(HttpRange::new(endpoint)))))
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Skip names matching any pattern. One regex per line; blank lines
    /// and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Pattern` for an invalid regex.
    pub fn with_excludes(mut self, patterns: &str) -> Result<Self> {
        for line in patterns.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.excludes
                .push(Regex::new(line).map_err(ValidationError::Pattern)?);
        }
        Ok(self)
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers.max(1));
        self
    }

    /// Worker count: the backend hint, capped by the configured value.
    fn workers(&self, hint: usize) -> usize {
        let hint = hint.max(1);
        self.concurrency.map_or(hint, |c| c.min(hint)).max(1)
    }

    /// Audit `names` read through `source`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Aborted` if the context is canceled. Per-secret
    /// failures are findings, not errors.
    pub fn run(&self, ctx: &Context, source: &dyn SecretSource, names: &[String]) -> Result<Report> {
        let names: Vec<&String> = names
            .iter()
            .filter(|n| !self.excludes.iter().any(|re| re.is_match(n)))
            .collect();
        let total = names.len();
        let workers = self.workers(source.concurrency()).min(total.max(1));
        info!(secrets = total, workers, "starting audit");

        let builder = ReportBuilder::new();
        let done = AtomicUsize::new(0);
        let (tx, rx) = mpsc::sync_channel::<String>(workers * 4);
        let rx = Mutex::new(rx);

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let name = match rx.lock().recv() {
                        Ok(n) => n,
                        Err(_) => break,
                    };
                    // keep draining after cancel so the producer never blocks
                    if ctx.is_canceled() {
                        continue;
                    }
                    self.audit_one(ctx, source, &name, &builder);
                    let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                    ctx.progress(n, total);
                });
            }
            for name in &names {
                if ctx.is_canceled() || tx.send((*name).clone()).is_err() {
                    break;
                }
            }
            drop(tx);
        });

        ctx.check_canceled()?;
        let report = builder.finalize();
        debug!(flagged = report.flagged(), "audit finished");
        Ok(report)
    }

    fn audit_one(&self, ctx: &Context, source: &dyn SecretSource, name: &str, builder: &ReportBuilder) {
        let secret = match source.get(ctx, name) {
            Ok(s) => s,
            Err(e) => {
                builder.add_finding(name, "read", Finding::error(e.to_string()));
                return;
            }
        };
        builder.touch(name);
        if secret.password().is_empty() {
            return;
        }
        builder.add_password(name, secret.password());
        for v in &self.validators {
            if let Some(finding) = v.check(ctx, name, &secret) {
                builder.add_finding(name, v.name(), finding);
            }
        }

        match source.revisions(ctx, name) {
            Ok(revs) => {
                if let Some(oldest) = revs.last() {
                    let days = (Utc::now() - oldest.date).num_days();
                    builder.set_age(name, days);
                    if days > MAX_AGE_DAYS {
                        builder.add_finding(
                            name,
                            "age",
                            Finding::warning(format!("password is {} days old", days)),
                        );
                    }
                }
            }
            Err(e) => debug!(secret = name, "age unknown: {}", e),
        }
    }
}
