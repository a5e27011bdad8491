//! Root store: the mount table.
//!
//! A [`RootStore`] maps mount aliases to sub-stores and routes every
//! logical name to the mount whose alias is its longest prefix. The empty
//! alias is the root mount; without one, only names under a sub-mount are
//! addressable.

mod sync;
mod transfer;
mod tree;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::cipher::CipherKind;
use crate::core::config::{self, Config, Level};
use crate::core::context::Context;
use crate::core::leaf::{config_alias, Store};
use crate::core::secret::Secret;
use crate::core::storage::StorageKind;
use crate::core::types::Revision;
use crate::error::{Error, Result, StoreError};

pub use sync::SyncOutcome;
pub use tree::{ListOptions, Tree};

/// All mounted sub-stores, keyed by alias.
#[derive(Debug)]
pub struct RootStore {
    config: Arc<Config>,
    mounts: BTreeMap<String, Store>,
}

impl RootStore {
    // --- Construction ---

    /// Empty mount table.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            mounts: BTreeMap::new(),
        }
    }

    /// Open the root mount from `mounts.path` and every sub-mount declared
    /// as `mounts.<alias>.path`.
    ///
    /// Mounts whose directory is missing are skipped with a warning so one
    /// stale entry does not lock the user out of the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured backend cannot be built.
    pub fn open(config: Arc<Config>) -> Result<Self> {
        let mut root = Self::new(config.clone());
        if let Some(path) = config.get_raw("mounts.path") {
            let path = PathBuf::from(config::expand_home(&path));
            root.insert(Store::open("", &path, config.clone())?)?;
        }
        for (alias, path) in config.mounts() {
            if alias == config_alias("") {
                continue;
            }
            if !path.exists() {
                warn!(alias, path = %path.display(), "mount path does not exist, skipping");
                continue;
            }
            root.insert(Store::open(&alias, &path, config.clone())?)?;
        }
        debug!(mounts = root.mounts.len(), "opened root store");
        Ok(root)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add an already-built sub-store to the table without touching config.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MountExists` if the alias is taken.
    pub fn insert(&mut self, store: Store) -> Result<()> {
        let alias = store.alias().to_string();
        if self.mounts.contains_key(&alias) {
            return Err(StoreError::MountExists(config_alias(&alias).to_string()).into());
        }
        self.mounts.insert(alias, store);
        Ok(())
    }

    // --- Mount management ---

    /// Create and initialize a sub-store at `path`, then mount it.
    ///
    /// An empty `alias` initializes the root mount and records it as
    /// `mounts.path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyInitialized` if `path` already holds a
    /// store and `StoreError::MountExists` if the alias is taken.
    pub fn init(
        &mut self,
        ctx: &Context,
        alias: &str,
        path: &Path,
        recipients: &[String],
        crypto: CipherKind,
        storage: StorageKind,
    ) -> Result<()> {
        let alias = normalize_alias(alias)?;
        if self.mounts.contains_key(&alias) {
            return Err(StoreError::MountExists(config_alias(&alias).to_string()).into());
        }
        let store = Store::create(&alias, path, crypto, storage, self.config.clone())?;
        store.init(ctx, recipients)?;
        self.persist_mount(&alias, path, Some((crypto, storage)))?;
        self.mounts.insert(alias, store);
        Ok(())
    }

    /// Mount an existing, initialized store under `alias`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidName` for an empty or reserved alias,
    /// `StoreError::MountExists` if the alias is taken, and
    /// `StoreError::NotInitialized` if `path` holds no store.
    pub fn mount(&mut self, ctx: &Context, alias: &str, path: &Path) -> Result<()> {
        let alias = normalize_alias(alias)?;
        if alias.is_empty() {
            return Err(StoreError::InvalidName("mount alias cannot be empty".into()).into());
        }
        if self.mounts.contains_key(&alias) {
            return Err(StoreError::MountExists(alias).into());
        }
        let store = Store::open(&alias, path, self.config.clone())?;
        if !store.is_initialized(ctx) {
            return Err(StoreError::NotInitialized(path.to_path_buf()).into());
        }
        self.persist_mount(&alias, path, None)?;
        info!(alias = %alias, path = %path.display(), "Mounted {}", alias);
        self.mounts.insert(alias, store);
        Ok(())
    }

    /// Remove a sub-mount from the table and from user config. The store
    /// directory is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoMount` if nothing is mounted at `alias`.
    pub fn unmount(&mut self, alias: &str) -> Result<()> {
        let alias = normalize_alias(alias)?;
        if alias.is_empty() {
            return Err(StoreError::InvalidName("cannot unmount the root store".into()).into());
        }
        if self.mounts.remove(&alias).is_none() {
            return Err(StoreError::NoMount(alias).into());
        }
        for what in ["path", "crypto", "storage"] {
            self.config
                .unset(Level::User, &format!("mounts.{}.{}", alias, what))?;
        }
        info!(alias = %alias, "unmounted");
        Ok(())
    }

    fn persist_mount(
        &self,
        alias: &str,
        path: &Path,
        backends: Option<(CipherKind, StorageKind)>,
    ) -> Result<()> {
        let path = path.to_string_lossy();
        if alias.is_empty() {
            self.config.set(Level::User, "mounts.path", &path)?;
        } else {
            self.config
                .set(Level::User, &format!("mounts.{}.path", alias), &path)?;
        }
        if let Some((crypto, storage)) = backends {
            let key = |what: &str| format!("mounts.{}.{}", config_alias(alias), what);
            self.config.set(Level::User, &key("crypto"), crypto.name())?;
            self.config.set(Level::User, &key("storage"), storage.name())?;
        }
        Ok(())
    }

    /// `(alias, path)` for every mount, root first.
    pub fn mounts(&self) -> Vec<(&str, &Path)> {
        self.mounts
            .values()
            .map(|s| (s.alias(), s.path()))
            .collect()
    }

    pub fn has_root(&self) -> bool {
        self.mounts.contains_key("")
    }

    /// Sub-store mounted at exactly `alias` (`""` or `root` for the root
    /// mount).
    pub fn store(&self, alias: &str) -> Result<&Store> {
        let alias = alias.trim_matches('/');
        let key = if alias == config_alias("") { "" } else { alias };
        self.mounts
            .get(key)
            .ok_or_else(|| StoreError::NoMount(alias.to_string()).into())
    }

    /// True if `name` is exactly a sub-mount alias.
    pub fn is_mount_point(&self, name: &str) -> bool {
        let name = name.trim_matches('/');
        !name.is_empty() && self.mounts.contains_key(name)
    }

    // --- Routing ---

    /// Sub-store responsible for `name` and the name relative to it.
    ///
    /// A trailing `/` on `name` is kept on the relative name so directory
    /// semantics survive routing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoMount` if no alias prefixes `name` and there
    /// is no root mount.
    pub fn route(&self, name: &str) -> Result<(&Store, String)> {
        let name = name.trim_start_matches('/');
        let best = self
            .mounts
            .keys()
            .filter(|alias| covers(alias, name))
            .max_by_key(|alias| alias.len());
        match best {
            Some(alias) => {
                let store = &self.mounts[alias];
                Ok((store, strip_alias(alias, name)))
            }
            None => Err(StoreError::NoMount(name.to_string()).into()),
        }
    }

    // --- Secret operations ---

    pub fn get(&self, ctx: &Context, name: &str) -> Result<Secret> {
        let (store, rel) = self.route(name)?;
        store.get(ctx, &rel).map_err(|e| renamed(e, &rel, name))
    }

    pub fn get_revision(&self, ctx: &Context, name: &str, rev: &str) -> Result<Secret> {
        let (store, rel) = self.route(name)?;
        store.get_revision(ctx, &rel, rev)
    }

    pub fn revisions(&self, ctx: &Context, name: &str) -> Result<Vec<Revision>> {
        let (store, rel) = self.route(name)?;
        store.revisions(ctx, &rel)
    }

    pub fn set(&self, ctx: &Context, name: &str, secret: &Secret) -> Result<()> {
        if self.is_mount_point(name) {
            return Err(StoreError::MountPoint(name.to_string()).into());
        }
        let (store, rel) = self.route(name)?;
        store.set(ctx, &rel, secret)
    }

    pub fn exists(&self, ctx: &Context, name: &str) -> bool {
        self.route(name)
            .map(|(store, rel)| store.exists(ctx, &rel))
            .unwrap_or(false)
    }

    pub fn is_dir(&self, ctx: &Context, name: &str) -> bool {
        if self.is_mount_point(name) {
            return true;
        }
        self.route(name)
            .map(|(store, rel)| store.is_dir(ctx, &rel))
            .unwrap_or(false)
    }

    /// Delete one secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MountPoint` when `name` is a mount alias.
    pub fn delete(&self, ctx: &Context, name: &str) -> Result<()> {
        if self.is_mount_point(name) {
            return Err(StoreError::MountPoint(name.to_string()).into());
        }
        let (store, rel) = self.route(name)?;
        store.delete(ctx, &rel).map_err(|e| renamed(e, &rel, name))
    }

    /// Delete every secret below `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MountPoint` if any mount lives inside the
    /// subtree; unmount it first.
    pub fn prune(&self, ctx: &Context, prefix: &str) -> Result<()> {
        let dir = prefix.trim_matches('/');
        if let Some(alias) = self
            .mounts
            .keys()
            .find(|alias| !alias.is_empty() && covers(dir, alias))
        {
            return Err(StoreError::MountPoint(alias.clone()).into());
        }
        let (store, rel) = self.route(dir)?;
        store.prune(ctx, &rel)
    }

    /// Link two names inside the same mount.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CrossMount` when the names route to different
    /// sub-stores.
    pub fn link(&self, ctx: &Context, from: &str, to: &str) -> Result<()> {
        let (src, src_rel) = self.route(from)?;
        let (dst, dst_rel) = self.route(to)?;
        if src.alias() != dst.alias() {
            return Err(StoreError::CrossMount {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        src.link(ctx, &src_rel, &dst_rel)
    }

    /// Template that applies to `name`, as `(template name, body)` with
    /// the template name in root-store form.
    pub fn lookup_template(&self, ctx: &Context, name: &str) -> Result<Option<(String, Vec<u8>)>> {
        let (store, rel) = self.route(name)?;
        Ok(store
            .lookup_template(ctx, &rel)?
            .map(|(t, body)| (join_alias(store.alias(), &t), body)))
    }
}

/// Trim slashes and reject aliases that cannot be routed to.
fn normalize_alias(alias: &str) -> Result<String> {
    let alias = alias.trim_matches('/');
    if alias == config_alias("") {
        return Err(StoreError::InvalidName(format!("{} is reserved", alias)).into());
    }
    if alias.split('/').any(|seg| seg == ".." || seg == "." || seg.starts_with('.')) {
        return Err(StoreError::InvalidName(alias.to_string()).into());
    }
    Ok(alias.to_string())
}

/// True if `name` lives inside `alias` (or is it).
fn covers(alias: &str, name: &str) -> bool {
    if alias.is_empty() {
        return true;
    }
    let name = name.trim_end_matches('/');
    name == alias || name.starts_with(&format!("{}/", alias))
}

fn strip_alias(alias: &str, name: &str) -> String {
    if alias.is_empty() {
        return name.to_string();
    }
    name.strip_prefix(alias)
        .unwrap_or(name)
        .trim_start_matches('/')
        .to_string()
}

pub(crate) fn join_alias(alias: &str, name: &str) -> String {
    if alias.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        format!("{}/", alias)
    } else {
        format!("{}/{}", alias, name)
    }
}

/// Report a not-found error with the full logical name.
fn renamed(err: Error, rel: &str, full: &str) -> Error {
    match err {
        Error::Store(StoreError::NotFound(n)) if n == rel => {
            StoreError::NotFound(full.to_string()).into()
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::leaf::testing::memory_store_at;

    /// Root store with an in-memory root mount for `x` and a `team` mount
    /// for `x` and `y`.
    pub fn two_mounts() -> RootStore {
        let mut root = RootStore::new(Arc::new(Config::in_memory()));
        root.insert(memory_store_at("", &["x"])).unwrap();
        root.insert(memory_store_at("team", &["x", "y"])).unwrap();
        root
    }
}
