//! Per-mount maintenance: sync, recipients, fsck.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::RootStore;
use crate::core::constants::{DEFAULT_BRANCH, DEFAULT_REMOTE};
use crate::core::context::Context;
use crate::core::leaf::{FsckReport, Store};
use crate::core::storage;
use crate::error::Result;

/// What a sync did for one mount.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub store: String,
    pub pulled: bool,
    pub imported: usize,
    pub exported: usize,
    pub pushed: bool,
    /// Set when the mount failed; other mounts are still synced.
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl RootStore {
    /// Pull, exchange public keys, push.
    ///
    /// Runs for every mount, or only `alias` when given. A failing mount is
    /// recorded in its [`SyncOutcome`] and the loop continues.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoMount` if `alias` is not mounted.
    pub fn sync(&self, ctx: &Context, alias: Option<&str>) -> Result<Vec<SyncOutcome>> {
        let stores: Vec<&Store> = match alias {
            Some(a) => vec![self.store(a)?],
            None => self.mounts.values().collect(),
        };
        let exportkeys = self.config.get_bool("core.exportkeys");

        let mut outcomes = Vec::with_capacity(stores.len());
        for store in stores {
            ctx.check_canceled()?;
            let mut outcome = SyncOutcome {
                store: display(store).to_string(),
                ..Default::default()
            };
            if let Err(e) = sync_one(ctx, store, exportkeys, &mut outcome) {
                warn!(store = %outcome.store, "sync failed: {}", e);
                outcome.error = Some(e.to_string());
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    // --- Recipients per mount ---

    pub fn list_recipients(&self, ctx: &Context, alias: &str) -> Result<Vec<String>> {
        self.store(alias)?.list_recipients(ctx)
    }

    pub fn add_recipient(&self, ctx: &Context, alias: &str, id: &str) -> Result<()> {
        self.store(alias)?.add_recipient(ctx, id)
    }

    pub fn remove_recipient(&self, ctx: &Context, alias: &str, id: &str) -> Result<()> {
        self.store(alias)?.remove_recipient(ctx, id)
    }

    /// Refresh the recipient hash of every mount, after the user reviewed
    /// an out-of-band change. Returns `(store, hash)` pairs.
    pub fn update_recipients_hash(&self, ctx: &Context) -> Result<Vec<(String, String)>> {
        self.mounts
            .values()
            .map(|s| Ok((display(s).to_string(), s.update_recipients_hash(ctx)?)))
            .collect()
    }

    // --- Fsck ---

    /// Check every mount, or only the one `prefix` routes to.
    pub fn fsck(&self, ctx: &Context, prefix: &str) -> Result<Vec<FsckReport>> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return self.mounts.values().map(|s| s.fsck(ctx, "")).collect();
        }
        let (store, rel) = self.route(prefix)?;
        Ok(vec![store.fsck(ctx, &rel)?])
    }
}

fn sync_one(ctx: &Context, store: &Store, exportkeys: bool, out: &mut SyncOutcome) -> Result<()> {
    match store.storage().pull(ctx, DEFAULT_REMOTE, DEFAULT_BRANCH) {
        Ok(()) => out.pulled = true,
        Err(e) if storage::is_benign_rcs(&e) => debug!(store = %out.store, "pull skipped: {}", e),
        Err(e) => return Err(e),
    }

    if exportkeys {
        out.imported = store.import_public_keys(ctx)?;
        out.exported = store.export_public_keys(ctx)?.len();
    }

    match store.storage().push(ctx, DEFAULT_REMOTE, DEFAULT_BRANCH) {
        Ok(()) => out.pushed = true,
        Err(e) if storage::is_benign_rcs(&e) => debug!(store = %out.store, "push skipped: {}", e),
        Err(e) => return Err(e),
    }
    info!(
        store = %out.store,
        pulled = out.pulled,
        imported = out.imported,
        exported = out.exported,
        pushed = out.pushed,
        "synced"
    );
    Ok(())
}

fn display(store: &Store) -> &str {
    crate::core::leaf::config_alias(store.alias())
}

#[cfg(test)]
mod tests {
    use super::super::testing::two_mounts;
    use super::*;
    use crate::core::secret::Secret;
    use crate::error::ErrorKind;

    #[test]
    fn test_sync_without_remote_is_clean() {
        let root = two_mounts();
        let ctx = Context::new();
        let outcomes = root.sync(&ctx, None).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(SyncOutcome::is_ok));
        assert!(outcomes.iter().all(|o| !o.pushed && !o.pulled));
        assert_eq!(outcomes[1].store, "team");
    }

    #[test]
    fn test_sync_single_mount_pushes() {
        let root = two_mounts();
        let ctx = Context::new();
        let team = root.store("team").unwrap();
        team.storage()
            .add_remote(&ctx, DEFAULT_REMOTE, "mem://team")
            .unwrap();

        let outcomes = root.sync(&ctx, Some("team")).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].pulled && outcomes[0].pushed);

        assert_eq!(root.sync(&ctx, Some("nope")).unwrap_err().kind(), ErrorKind::NoMount);
    }

    #[test]
    fn test_sync_respects_no_network() {
        let root = two_mounts();
        let ctx = Context::new().with_no_network(true);
        let team = root.store("team").unwrap();
        team.storage()
            .add_remote(&ctx, DEFAULT_REMOTE, "mem://team")
            .unwrap();
        let outcomes = root.sync(&ctx, Some("team")).unwrap();
        assert!(outcomes[0].is_ok());
    }

    #[test]
    fn test_recipients_per_mount() {
        let root = two_mounts();
        let ctx = Context::new();
        root.set(&ctx, "team/a", &Secret::with_password("1")).unwrap();
        assert_eq!(root.list_recipients(&ctx, "team").unwrap(), vec!["x", "y"]);
        assert_eq!(root.list_recipients(&ctx, "root").unwrap(), vec!["x"]);

        root.remove_recipient(&ctx, "team", "y").unwrap();
        assert_eq!(root.list_recipients(&ctx, "team").unwrap(), vec!["x"]);
        assert_eq!(root.get(&ctx, "team/a").unwrap().password(), "1");
        assert_eq!(root.update_recipients_hash(&ctx).unwrap().len(), 2);
    }

    #[test]
    fn test_fsck_all_mounts() {
        let root = two_mounts();
        let ctx = Context::new();
        root.set(&ctx, "a", &Secret::with_password("1")).unwrap();
        root.set(&ctx, "team/b", &Secret::with_password("2")).unwrap();
        let reports = root.fsck(&ctx, "").unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(FsckReport::is_clean));

        let reports = root.fsck(&ctx, "team").unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].store, "team");
        assert_eq!(reports[0].checked, 1);
    }
}
