//! Sub-store: one encryption domain.
//!
//! A [`Store`] binds a crypto backend to a storage backend under a single
//! recipient list. Names passed in are relative to the sub-store root and
//! carry no crypto suffix; the store appends it.

mod fsck;
mod recipients;
mod secrets;
mod templates;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::cipher::{Cipher, CipherKind};
use crate::core::config::{Config, Level};
use crate::core::constants::{self, DEFAULT_BRANCH, DEFAULT_REMOTE, ROOT_ALIAS};
use crate::core::context::Context;
use crate::core::recipients::Recipients;
use crate::core::storage::{self, Storage, StorageKind};
use crate::error::{ErrorKind, RecipientError, Result, StoreError, ValidationError};

pub use fsck::FsckReport;

/// One mounted sub-store.
pub struct Store {
    pub(super) alias: String,
    pub(super) path: PathBuf,
    pub(super) cipher: Box<dyn Cipher>,
    pub(super) storage: Box<dyn Storage>,
    pub(super) config: Arc<Config>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("alias", &self.alias)
            .field("path", &self.path)
            .field("crypto", &self.cipher.name())
            .field("storage", &self.storage.name())
            .finish()
    }
}

impl Store {
    // --- Construction ---

    /// Assemble a store from explicit backends.
    pub fn new(
        alias: &str,
        path: impl Into<PathBuf>,
        cipher: Box<dyn Cipher>,
        storage: Box<dyn Storage>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            alias: alias.trim_matches('/').to_string(),
            path: path.into(),
            cipher,
            storage,
            config,
        }
    }

    /// Open the sub-store at `path`, picking backends from config
    /// (`mounts.<alias>.crypto`, `mounts.<alias>.storage`) or the on-disk
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured backend name is unknown or the
    /// crypto backend cannot be started.
    pub fn open(alias: &str, path: &Path, config: Arc<Config>) -> Result<Self> {
        let key = |what: &str| format!("mounts.{}.{}", config_alias(alias), what);
        let crypto = match config.get_raw(&key("crypto")) {
            Some(name) => CipherKind::from_name(&name)?,
            None => CipherKind::detect(path).unwrap_or(CipherKind::Age),
        };
        let storage = match config.get_raw(&key("storage")) {
            Some(name) => StorageKind::from_name(&name)?,
            None => StorageKind::detect(path),
        };
        Self::create(alias, path, crypto, storage, config)
    }

    /// Build a store with the named backends.
    pub fn create(
        alias: &str,
        path: &Path,
        crypto: CipherKind,
        storage: StorageKind,
        config: Arc<Config>,
    ) -> Result<Self> {
        let cipher = crypto.build(&config)?;
        let storage = storage.build(path);
        debug!(
            alias,
            path = %path.display(),
            crypto = cipher.name(),
            storage = storage.name(),
            "opened sub-store"
        );
        Ok(Self::new(alias, path, cipher, storage, config))
    }

    /// Mount alias. Empty for the root mount.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cipher(&self) -> &dyn Cipher {
        self.cipher.as_ref()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- Lifecycle ---

    /// True if the recipient file is readable and lists at least one id.
    pub fn is_initialized(&self, ctx: &Context) -> bool {
        self.storage
            .get(ctx, self.cipher.id_file())
            .map(|b| !Recipients::parse(&String::from_utf8_lossy(&b)).is_empty())
            .unwrap_or(false)
    }

    /// Write the recipient file and make the initial commit.
    ///
    /// # Arguments
    ///
    /// * `recipients` - Key ids or search terms resolved by the crypto backend
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyInitialized` if a recipient file exists,
    /// `RecipientError::Unknown` if a recipient cannot be resolved.
    pub fn init(&self, ctx: &Context, recipients: &[String]) -> Result<()> {
        if self.is_initialized(ctx) {
            return Err(StoreError::AlreadyInitialized(self.path.clone()).into());
        }
        if recipients.is_empty() {
            return Err(
                ValidationError::InvalidArgument("at least one recipient is required".into())
                    .into(),
            );
        }

        let mut ids = Vec::with_capacity(recipients.len());
        for r in recipients {
            ids.push(self.resolve_recipient(ctx, r)?);
        }
        let list = Recipients::from_ids(&ids);

        let username = ctx
            .username()
            .map(str::to_string)
            .unwrap_or_else(whoami::username);
        storage::tolerate(
            "init",
            self.storage
                .init_rcs(ctx, &username, ctx.email().unwrap_or_default()),
        )?;

        let id_file = self.cipher.id_file();
        self.storage.set(ctx, id_file, list.marshal().as_bytes())?;

        let mut paths = vec![id_file.to_string()];
        if self.config.get_bool("core.exportkeys") {
            paths.extend(self.export_public_keys_unstaged(ctx, &list)?);
        }
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        self.commit(
            ctx,
            &paths,
            &format!("Initialized store for {}", ids.join(", ")),
        )?;
        self.save_recipients_hash(&list);

        info!(alias = %self.alias, path = %self.path.display(), "initialized sub-store");
        Ok(())
    }

    // --- Internal helpers ---

    /// Blob name for a secret.
    pub(crate) fn passfile(&self, name: &str) -> String {
        format!("{}.{}", name.trim_matches('/'), self.cipher.ext())
    }

    /// Secret name for a blob, if it carries this store's suffix.
    pub(crate) fn secret_name<'a>(&self, file: &'a str) -> Option<&'a str> {
        file.strip_suffix(self.cipher.ext())
            .and_then(|f| f.strip_suffix('.'))
            .filter(|f| !f.is_empty())
    }

    pub(super) fn read_recipients(&self, ctx: &Context) -> Result<Recipients> {
        let bytes = match self.storage.get(ctx, self.cipher.id_file()) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(self.path.clone()).into())
            }
            Err(e) => return Err(e),
        };
        let list = Recipients::parse(&String::from_utf8_lossy(&bytes));
        if list.is_empty() {
            return Err(StoreError::NotInitialized(self.path.clone()).into());
        }
        self.check_drift(&list);
        Ok(list)
    }

    fn check_drift(&self, list: &Recipients) {
        let key = constants::recipients_hash_key(&self.alias);
        if let Some(stored) = self.config.get_raw(&key) {
            if stored != list.hash() {
                warn!(
                    store = %self.display_alias(),
                    "recipient list changed outside gpass, run `gpass recipients update` after review"
                );
            }
        }
    }

    pub(super) fn save_recipients_hash(&self, list: &Recipients) {
        let key = constants::recipients_hash_key(&self.alias);
        if let Err(e) = self.config.set(Level::User, &key, &list.hash()) {
            warn!(key, "could not persist recipient hash: {}", e);
        }
    }

    pub(super) fn display_alias(&self) -> &str {
        if self.alias.is_empty() {
            ROOT_ALIAS
        } else {
            &self.alias
        }
    }

    /// Decrypt, importing missing recipient keys once on failure.
    pub(super) fn decrypt(&self, ctx: &Context, blob: &[u8]) -> Result<Vec<u8>> {
        match self.cipher.decrypt(ctx, blob) {
            Err(e)
                if e.kind() == ErrorKind::DecryptionFailed
                    && self.config.get_bool("core.autoimport") =>
            {
                if self.import_missing_keys(ctx)? > 0 {
                    debug!("retrying decrypt after key import");
                    return self.cipher.decrypt(ctx, blob);
                }
                Err(e)
            }
            other => other,
        }
    }

    /// Encrypt, importing missing recipient keys once on failure.
    pub(super) fn encrypt(&self, ctx: &Context, plain: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        match self.cipher.encrypt(ctx, plain, recipients) {
            Err(e)
                if e.kind() == ErrorKind::EncryptionFailed
                    && self.config.get_bool("core.autoimport") =>
            {
                if self.import_missing_keys(ctx)? > 0 {
                    debug!("retrying encrypt after key import");
                    return self.cipher.encrypt(ctx, plain, recipients);
                }
                Err(e)
            }
            other => other,
        }
    }

    /// Stage `paths` and commit unless the context is in bulk mode.
    pub(crate) fn commit(&self, ctx: &Context, paths: &[&str], message: &str) -> Result<()> {
        storage::tolerate("add", self.storage.add(ctx, paths))?;
        if !ctx.is_commit() {
            return Ok(());
        }
        let message = ctx.commit_message_or(message);
        storage::tolerate("commit", self.storage.commit(ctx, &message))?;
        self.autosync(ctx);
        Ok(())
    }

    /// Push after a commit when `core.autosync` is on. Failures only warn;
    /// the local commit already happened.
    fn autosync(&self, ctx: &Context) {
        if ctx.is_no_network()
            || !self.config.get_bool("core.autosync")
            || !self.config.get_bool("core.autopush")
        {
            return;
        }
        match self.storage.push(ctx, DEFAULT_REMOTE, DEFAULT_BRANCH) {
            Ok(()) => debug!(store = %self.display_alias(), "autosync pushed"),
            Err(e) if storage::is_benign_rcs(&e) => debug!("autosync skipped: {}", e),
            Err(e) => warn!(store = %self.display_alias(), "autosync push failed: {}", e),
        }
    }

    /// Canonical id for `query`, or the query itself in force mode.
    pub(super) fn resolve_recipient(&self, ctx: &Context, query: &str) -> Result<String> {
        let query = query.trim();
        if self.cipher.name() == "plain" {
            return Ok(query.to_string());
        }
        let matches = self.cipher.find_recipients(ctx, query)?;
        match matches.as_slice() {
            [one] => Ok(self.cipher.fingerprint(ctx, one)),
            [] if ctx.is_force() => {
                warn!(recipient = query, "unknown recipient, continuing in force mode");
                Ok(query.to_string())
            }
            [] => Err(RecipientError::Unknown(query.to_string()).into()),
            many => match many.iter().find(|m| m.eq_ignore_ascii_case(query)) {
                Some(exact) => Ok(self.cipher.fingerprint(ctx, exact)),
                None => Err(RecipientError::Unknown(format!(
                    "{} matches {} keys, be more specific",
                    query,
                    many.len()
                ))
                .into()),
            },
        }
    }
}

/// Alias as it appears in `mounts.<alias>.*` config keys.
pub(crate) fn config_alias(alias: &str) -> &str {
    let alias = alias.trim_matches('/');
    if alias.is_empty() {
        ROOT_ALIAS
    } else {
        alias
    }
}
