//! Recipient operations.
//!
//! Membership changes rewrite the recipient file and re-encrypt every
//! secret of the sub-store in a single commit.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::Store;
use crate::core::constants::PUBLIC_KEY_DIR;
use crate::core::context::Context;
use crate::core::recipients::Recipients;
use crate::error::{RecipientError, Result};

impl Store {
    /// Current recipient ids, in file order.
    pub fn list_recipients(&self, ctx: &Context) -> Result<Vec<String>> {
        Ok(self.read_recipients(ctx)?.ids())
    }

    /// Add a recipient and re-encrypt every secret for the new list.
    ///
    /// # Errors
    ///
    /// Returns `RecipientError::Unknown` if the id does not resolve to a
    /// known key (unless forced), `RecipientError::AlreadyPresent` if it is
    /// already listed, or the first decrypt/encrypt failure of the
    /// re-encryption pass.
    pub fn add_recipient(&self, ctx: &Context, id: &str) -> Result<()> {
        let old = self.read_recipients(ctx)?;
        let id = self.resolve_recipient(ctx, id)?;
        if old.contains(&id) {
            return Err(RecipientError::AlreadyPresent(id).into());
        }
        let mut new = old.clone();
        new.add(&id);

        self.reencrypt(ctx, &old, &new, &[])?;
        info!(recipient = %id, store = %self.display_alias(), "added recipient");
        Ok(())
    }

    /// Remove a recipient and re-encrypt every secret without it.
    ///
    /// Past revisions stay readable by the removed party.
    ///
    /// # Errors
    ///
    /// Returns `RecipientError::NotInStore` if the id is not listed and
    /// `RecipientError::LastRecipient` if it is the only one.
    pub fn remove_recipient(&self, ctx: &Context, id: &str) -> Result<()> {
        let old = self.read_recipients(ctx)?;
        let id = if old.contains(id) {
            id.trim().to_string()
        } else {
            let resolved = self.resolve_recipient(ctx, id)?;
            if !old.contains(&resolved) {
                return Err(RecipientError::NotInStore(resolved).into());
            }
            resolved
        };
        if old.len() == 1 {
            return Err(RecipientError::LastRecipient.into());
        }
        let mut new = old.clone();
        new.remove(&id);

        let key_file = public_key_file(&id);
        let obsolete: Vec<String> = if self.storage.exists(ctx, &key_file) {
            vec![key_file]
        } else {
            Vec::new()
        };

        self.reencrypt(ctx, &old, &new, &obsolete)?;
        warn!(
            recipient = %id,
            "removed recipient can still decrypt every past revision in the store history"
        );
        info!(recipient = %id, store = %self.display_alias(), "removed recipient");
        Ok(())
    }

    /// Recompute the recipient hash and store it in the user config,
    /// without touching the recipient file.
    pub fn update_recipients_hash(&self, ctx: &Context) -> Result<String> {
        let list = self.read_recipients(ctx)?;
        self.save_recipients_hash(&list);
        Ok(list.hash())
    }

    /// Write public keys of all recipients to `.public-keys/` and commit.
    ///
    /// Returns the key files that changed.
    pub fn export_public_keys(&self, ctx: &Context) -> Result<Vec<String>> {
        let list = self.read_recipients(ctx)?;
        let changed = self.export_public_keys_unstaged(ctx, &list)?;
        if !changed.is_empty() {
            let paths: Vec<&str> = changed.iter().map(String::as_str).collect();
            self.commit(ctx, &paths, "Exported public keys")?;
        }
        Ok(changed)
    }

    /// Import keys from `.public-keys/` for recipients the keyring lacks.
    pub fn import_public_keys(&self, ctx: &Context) -> Result<usize> {
        self.import_missing_keys(ctx)
    }

    pub(super) fn export_public_keys_unstaged(
        &self,
        ctx: &Context,
        list: &Recipients,
    ) -> Result<Vec<String>> {
        let mut changed = Vec::new();
        for id in list.ids() {
            let key = match self.cipher.export_public_key(ctx, &id) {
                Ok(k) => k,
                Err(e) => {
                    debug!(recipient = %id, "cannot export public key: {}", e);
                    continue;
                }
            };
            let file = public_key_file(&id);
            if self.storage.get(ctx, &file).ok().as_deref() == Some(key.as_slice()) {
                continue;
            }
            self.storage.set(ctx, &file, &key)?;
            changed.push(file);
        }
        Ok(changed)
    }

    /// Import exported keys of unknown recipients. Each import needs the
    /// context's approval. Returns how many keys were imported.
    pub(super) fn import_missing_keys(&self, ctx: &Context) -> Result<usize> {
        let list = match self.read_recipients(ctx) {
            Ok(l) => l,
            Err(_) => return Ok(0),
        };
        let known = self.cipher.list_recipients(ctx)?;
        let mut imported = 0;
        for id in list.ids() {
            if known.iter().any(|k| k.eq_ignore_ascii_case(&id)) {
                continue;
            }
            let Ok(key) = self.storage.get(ctx, &public_key_file(&id)) else {
                debug!(recipient = %id, "no exported key in store");
                continue;
            };
            if !ctx.approve_import(&id) {
                debug!(recipient = %id, "key import declined");
                continue;
            }
            match self.cipher.import_public_key(ctx, &key) {
                Ok(imported_id) => {
                    info!(recipient = %imported_id, "imported public key");
                    imported += 1;
                }
                Err(e) => warn!(recipient = %id, "failed to import public key: {}", e),
            }
        }
        Ok(imported)
    }

    /// Rewrite the recipient file with `new` and re-encrypt every secret.
    ///
    /// All secrets are decrypted before anything is written, so a decrypt
    /// failure leaves the store untouched. A failure while writing restores
    /// the old recipient file and re-encrypts the entries already written
    /// back to `old`. `obsolete` files are deleted in the same commit.
    pub(super) fn reencrypt(
        &self,
        ctx: &Context,
        old: &Recipients,
        new: &Recipients,
        obsolete: &[String],
    ) -> Result<()> {
        let files: Vec<String> = self
            .storage
            .list(ctx, "")?
            .into_iter()
            .filter(|f| self.secret_name(f).is_some())
            .collect();
        let total = files.len();

        let mut plain = Vec::with_capacity(total);
        for file in &files {
            ctx.check_canceled()?;
            let blob = self.storage.get(ctx, file)?;
            let text = self.decrypt(ctx, &blob).map_err(|e| {
                warn!(secret = %file, "cannot decrypt, recipients unchanged");
                e
            })?;
            plain.push(Zeroizing::new(text));
        }

        let id_file = self.cipher.id_file();
        self.storage.set(ctx, id_file, new.marshal().as_bytes())?;

        let ids = new.ids();
        for (i, (file, text)) in files.iter().zip(&plain).enumerate() {
            let written = self
                .encrypt(ctx, text, &ids)
                .and_then(|blob| self.storage.set(ctx, file, &blob));
            if let Err(e) = written {
                warn!(secret = %file, "re-encryption failed, restoring previous recipients");
                self.rollback(ctx, old, &files[..i], &plain[..i]);
                return Err(e);
            }
            ctx.progress(i + 1, total);
        }

        for file in obsolete {
            self.storage.delete(ctx, file)?;
        }

        let mut paths: Vec<String> = vec![id_file.to_string()];
        paths.extend(files.iter().cloned());
        paths.extend(obsolete.iter().cloned());
        if self.config.get_bool("core.exportkeys") {
            paths.extend(self.export_public_keys_unstaged(ctx, new)?);
        }
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        self.commit(ctx, &paths, "Re-encrypted for recipients")?;
        self.save_recipients_hash(new);
        debug!(secrets = total, recipients = new.len(), "re-encrypted");
        Ok(())
    }

    fn rollback(
        &self,
        ctx: &Context,
        old: &Recipients,
        files: &[String],
        plain: &[Zeroizing<Vec<u8>>],
    ) {
        if let Err(e) = self
            .storage
            .set(ctx, self.cipher.id_file(), old.marshal().as_bytes())
        {
            warn!("could not restore recipient file, run fsck: {}", e);
            return;
        }
        let ids = old.ids();
        for (file, text) in files.iter().zip(plain) {
            let restored = self
                .cipher
                .encrypt(ctx, text, &ids)
                .and_then(|blob| self.storage.set(ctx, file, &blob));
            if let Err(e) = restored {
                warn!(secret = %file, "could not restore envelope, run fsck: {}", e);
            }
        }
    }
}

/// Store path of the exported public key for `id`.
pub(crate) fn public_key_file(id: &str) -> String {
    format!("{}/{}", PUBLIC_KEY_DIR, id.replace(['/', '\\'], "_"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::memory_store;
    use super::*;
    use crate::core::cipher::{Age, Cipher, Plain};
    use crate::core::config::Config;
    use crate::core::secret::Secret;
    use crate::core::storage::Memory;
    use crate::error::ErrorKind;
    use ::age::x25519;

    #[test]
    fn test_remove_recipient_reencrypts() {
        let store = memory_store(&["x", "y"]);
        let ctx = Context::new();
        store.set(&ctx, "s", &Secret::with_password("pw")).unwrap();

        store.remove_recipient(&ctx, "y").unwrap();
        assert_eq!(store.list_recipients(&ctx).unwrap(), vec!["x"]);

        let blob = store.storage().get(&ctx, "s.txt").unwrap();
        let only_y = Plain::new(vec!["y".into()]);
        assert_eq!(
            only_y.decrypt(&ctx, &blob).unwrap_err().kind(),
            ErrorKind::DecryptionFailed
        );
        let only_x = Plain::new(vec!["x".into()]);
        assert_eq!(only_x.decrypt(&ctx, &blob).unwrap(), b"pw\n");

        let revs = store.revisions(&ctx, "s").unwrap();
        assert_eq!(revs[0].subject, "Re-encrypted for recipients");
    }

    #[test]
    fn test_remove_recipient_age() {
        let x = x25519::Identity::generate();
        let y = x25519::Identity::generate();
        let (xr, yr) = (x.to_public().to_string(), y.to_public().to_string());
        let y_only = Age::with_identities(vec![y.clone()]);

        let store = Store::new(
            "",
            "inmem://",
            Box::new(Age::with_identities(vec![x.clone(), y])),
            Box::new(Memory::with_rcs()),
            Arc::new(Config::in_memory()),
        );
        let ctx = Context::new();
        store.init(&ctx, &[xr.clone(), yr.clone()]).unwrap();
        store.set(&ctx, "s", &Secret::with_password("pw")).unwrap();

        store.remove_recipient(&ctx, &yr).unwrap();
        assert_eq!(store.list_recipients(&ctx).unwrap(), vec![xr]);

        let blob = store.storage().get(&ctx, "s.age").unwrap();
        assert_eq!(
            y_only.decrypt(&ctx, &blob).unwrap_err().kind(),
            ErrorKind::DecryptionFailed
        );
        let x_only = Age::with_identities(vec![x]);
        assert_eq!(x_only.decrypt(&ctx, &blob).unwrap(), b"pw\n");
    }

    #[test]
    fn test_add_then_remove_keeps_plaintext() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        let mut s = Secret::with_password("pw");
        s.add("k", "v").unwrap();
        store.set(&ctx, "a/b", &s).unwrap();
        let before = store.storage().get(&ctx, ".plain-ids").unwrap();

        store.add_recipient(&ctx, "z").unwrap();
        assert_eq!(store.list_recipients(&ctx).unwrap(), vec!["x", "z"]);
        store.remove_recipient(&ctx, "z").unwrap();

        assert_eq!(store.storage().get(&ctx, ".plain-ids").unwrap(), before);
        assert!(store.get(&ctx, "a/b").unwrap().equivalent(&s));
    }

    #[test]
    fn test_recipient_errors() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        assert_eq!(
            store.add_recipient(&ctx, "x").unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            store.remove_recipient(&ctx, "x").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            store.remove_recipient(&ctx, "nobody").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_unknown_age_recipient_needs_force() {
        let x = x25519::Identity::generate();
        let xr = x.to_public().to_string();
        let store = Store::new(
            "",
            "inmem://",
            Box::new(Age::with_identities(vec![x])),
            Box::new(Memory::with_rcs()),
            Arc::new(Config::in_memory()),
        );
        let ctx = Context::new();
        store.init(&ctx, &[xr]).unwrap();
        assert_eq!(
            store.add_recipient(&ctx, "alice").unwrap_err().kind(),
            ErrorKind::RecipientUnknown
        );
    }

    #[test]
    fn test_decrypt_failure_aborts_before_writing() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        store.set(&ctx, "ok", &Secret::with_password("1")).unwrap();
        // envelope addressed to nobody we hold
        store
            .storage()
            .set(&ctx, "foreign.txt", b"gpass-plain:q\nsecret\n")
            .unwrap();
        let ok_before = store.storage().get(&ctx, "ok.txt").unwrap();

        let err = store.add_recipient(&ctx, "z").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
        assert_eq!(store.list_recipients(&ctx).unwrap(), vec!["x"]);
        assert_eq!(store.storage().get(&ctx, "ok.txt").unwrap(), ok_before);
    }

    #[test]
    fn test_hash_drift_refresh() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        store
            .storage()
            .set(&ctx, ".plain-ids", b"x\nintruder\n")
            .unwrap();
        let hash = store.update_recipients_hash(&ctx).unwrap();
        assert_eq!(
            store.config().get("recipients.hash.root").as_deref(),
            Some(hash.as_str())
        );
    }

    #[test]
    fn test_public_keys_exported_on_init() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        assert_eq!(store.storage().get(&ctx, ".public-keys/x").unwrap(), b"x\n");
        assert!(store.export_public_keys(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_import_needs_approval() {
        let store = memory_store(&["x"]);
        let ctx = Context::new();
        store.storage().set(&ctx, ".plain-ids", b"x\nw\n").unwrap();
        store.storage().set(&ctx, ".public-keys/w", b"w\n").unwrap();

        // interactive without a callback declines
        assert_eq!(store.import_public_keys(&ctx).unwrap(), 0);
        let approve = ctx.with_import_callback(Arc::new(|_: &str| true));
        assert_eq!(store.import_public_keys(&approve).unwrap(), 1);
        assert!(store
            .cipher()
            .list_recipients(&ctx)
            .unwrap()
            .contains(&"w".to_string()));
    }
}
