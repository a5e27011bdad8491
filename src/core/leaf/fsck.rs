//! Integrity check and reconciliation.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::Store;
use crate::core::context::Context;
use crate::core::secret::Secret;
use crate::error::{ErrorKind, Result};

/// Outcome of a fsck pass over one sub-store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FsckReport {
    pub store: String,
    pub checked: usize,
    /// Secrets that could not be read, decrypted or parsed.
    pub errors: Vec<(String, String)>,
    /// Secrets whose envelope recipients differ from the recipient file.
    pub drift: Vec<String>,
    /// Secrets re-encrypted for the current recipient list.
    pub repaired: Vec<String>,
    /// Secrets whose serialization does not survive a parse round trip.
    pub unstable: Vec<String>,
}

impl FsckReport {
    /// Number of unrecoverable problems.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.drift.is_empty() && self.unstable.is_empty()
    }
}

impl Store {
    /// Check every secret under `prefix`.
    ///
    /// Walks secrets in sorted order: read, decrypt, compare envelope
    /// recipients with the recipient file, and check that parsing is
    /// idempotent. With `ctx.is_fsck_decrypt()`, drifted secrets and secrets
    /// whose envelope does not expose recipients are re-encrypted. The
    /// recipient hash is refreshed at the end.
    pub fn fsck(&self, ctx: &Context, prefix: &str) -> Result<FsckReport> {
        self.storage.fsck(ctx)?;

        let recipients = self.read_recipients(ctx)?;
        let ids = recipients.ids();
        let wanted = fold(&ids);

        let mut files: Vec<String> = self
            .storage
            .list(ctx, prefix)?
            .into_iter()
            .filter(|f| self.secret_name(f).is_some())
            .collect();
        // a prefix may also name a single secret
        let single = self.passfile(prefix.trim_matches('/'));
        if !prefix.is_empty() && !prefix.ends_with('/') && self.storage.exists(ctx, &single) {
            files.push(single);
        }
        files.sort();
        let total = files.len();

        let mut report = FsckReport {
            store: self.display_alias().to_string(),
            ..Default::default()
        };
        for (i, file) in files.iter().enumerate() {
            ctx.check_canceled()?;
            let name = self.secret_name(file).unwrap_or(file).to_string();
            report.checked += 1;

            let blob = match self.storage.get(ctx, file) {
                Ok(b) => b,
                Err(e) => {
                    report.errors.push((name, e.to_string()));
                    ctx.progress(i + 1, total);
                    continue;
                }
            };
            let plain = match self.decrypt(ctx, &blob) {
                Ok(p) => Zeroizing::new(p),
                Err(e) => {
                    warn!(secret = %name, "cannot decrypt: {}", e);
                    report.errors.push((name, e.to_string()));
                    ctx.progress(i + 1, total);
                    continue;
                }
            };

            let needs_reencrypt = match self.cipher.recipient_ids(ctx, &blob) {
                Ok(found) if fold(&found) != wanted => {
                    if !ctx.is_fsck_decrypt() {
                        warn!(secret = %name, "recipients differ from the recipient file");
                        report.drift.push(name.clone());
                    }
                    true
                }
                Ok(_) => false,
                // backends that hide envelope recipients are always rewritten
                Err(e) => {
                    if e.kind() != ErrorKind::InvalidArgument {
                        debug!(secret = %name, "cannot read envelope recipients: {}", e);
                    }
                    true
                }
            };
            if needs_reencrypt && ctx.is_fsck_decrypt() {
                match self
                    .encrypt(ctx, &plain, &ids)
                    .and_then(|b| self.storage.set(ctx, file, &b))
                {
                    Ok(()) => report.repaired.push(name.clone()),
                    Err(e) => report.errors.push((name.clone(), e.to_string())),
                }
            }

            match Secret::parse(&plain) {
                Ok(first) => {
                    let bytes = first.bytes();
                    let stable = Secret::parse(&bytes)
                        .map(|second| second.bytes() == bytes)
                        .unwrap_or(false);
                    if !stable {
                        warn!(secret = %name, "secret does not round-trip");
                        report.unstable.push(name);
                    }
                }
                Err(e) => report.errors.push((name, e.to_string())),
            }
            ctx.progress(i + 1, total);
        }

        if !report.repaired.is_empty() {
            let paths: Vec<String> = report
                .repaired
                .iter()
                .map(|n| self.passfile(n))
                .collect();
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            self.commit(ctx, &paths, "fsck: re-encrypted for recipients")?;
        }
        self.save_recipients_hash(&recipients);

        info!(
            store = %report.store,
            checked = report.checked,
            errors = report.errors.len(),
            drift = report.drift.len(),
            repaired = report.repaired.len(),
            "fsck finished"
        );
        Ok(report)
    }
}

fn fold(ids: &[String]) -> BTreeSet<String> {
    ids.iter().map(|i| i.to_lowercase()).collect()
}
