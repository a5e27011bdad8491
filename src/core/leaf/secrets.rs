//! Secret operations.
//!
//! Read, write, list, move and link secrets inside one sub-store.

use tracing::{debug, info};

use super::Store;
use crate::core::context::Context;
use crate::core::secret::{Format, Secret};
use crate::core::types::Revision;
use crate::error::{Error, ErrorKind, Result, StoreError, ValidationError};

impl Store {
    /// Read, decrypt and parse a secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if there is no such secret and
    /// `CipherError::DecryptionFailed` if no local identity opens it.
    pub fn get(&self, ctx: &Context, name: &str) -> Result<Secret> {
        ctx.check_canceled()?;
        let blob = self
            .storage
            .get(ctx, &self.passfile(name))
            .map_err(|e| not_found_as(e, name))?;
        let plain = self.decrypt(ctx, &blob)?;
        parse(ctx, &plain)
    }

    /// Read a secret as of revision `rev`.
    pub fn get_revision(&self, ctx: &Context, name: &str, rev: &str) -> Result<Secret> {
        let blob = self
            .storage
            .get_revision(ctx, &self.passfile(name), rev)?;
        let plain = self.decrypt(ctx, &blob)?;
        parse(ctx, &plain)
    }

    /// History of a secret, newest first.
    pub fn revisions(&self, ctx: &Context, name: &str) -> Result<Vec<Revision>> {
        self.storage.revisions(ctx, &self.passfile(name))
    }

    /// Encrypt and store a secret, then commit.
    ///
    /// The commit message comes from the context or defaults to
    /// `Updated <name>`.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` or `StorageError::WriteFailed`.
    pub fn set(&self, ctx: &Context, name: &str, secret: &Secret) -> Result<()> {
        ctx.check_canceled()?;
        let recipients = self.read_recipients(ctx)?.ids();
        let file = self.passfile(name);
        let blob = self.encrypt(ctx, &secret.bytes(), &recipients)?;
        self.storage.set(ctx, &file, &blob)?;
        debug!(name, store = %self.display_alias(), "stored secret");
        self.commit(ctx, &[&file], &format!("Updated {}", name))
    }

    /// Remove a secret and commit.
    pub fn delete(&self, ctx: &Context, name: &str) -> Result<()> {
        let file = self.passfile(name);
        if !self.storage.exists(ctx, &file) {
            return Err(StoreError::NotFound(name.to_string()).into());
        }
        self.storage.delete(ctx, &file)?;
        self.commit(ctx, &[&file], &format!("Removed {}", name))
    }

    /// Remove every secret below a directory prefix and commit once.
    pub fn prune(&self, ctx: &Context, prefix: &str) -> Result<()> {
        let dir = prefix.trim_matches('/');
        self.storage
            .prune(ctx, dir)
            .map_err(|e| not_found_as(e, prefix))?;
        self.commit(ctx, &[dir], &format!("Removed {}/", dir))
    }

    pub fn exists(&self, ctx: &Context, name: &str) -> bool {
        self.storage.exists(ctx, &self.passfile(name))
    }

    pub fn is_dir(&self, ctx: &Context, name: &str) -> bool {
        self.storage.is_dir(ctx, name)
    }

    /// Secret names below `prefix`, sorted, without the crypto suffix.
    ///
    /// With a `depth`, deeper entries collapse into their folder at that
    /// depth, written with a trailing `/`.
    pub fn list(&self, ctx: &Context, prefix: &str, depth: Option<usize>) -> Result<Vec<String>> {
        let mut out: Vec<String> = self
            .storage
            .list(ctx, prefix)?
            .iter()
            .filter_map(|f| self.secret_name(f))
            .map(|name| match depth {
                Some(d) if name.split('/').count() > d.max(1) => {
                    let head: Vec<&str> = name.split('/').take(d.max(1)).collect();
                    format!("{}/", head.join("/"))
                }
                _ => name.to_string(),
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    /// Make `to` resolve to the secret at `from`.
    pub fn link(&self, ctx: &Context, from: &str, to: &str) -> Result<()> {
        if !self.exists(ctx, from) {
            return Err(StoreError::NotFound(from.to_string()).into());
        }
        let (src, dst) = (self.passfile(from), self.passfile(to));
        self.storage.link(ctx, &src, &dst)?;
        self.commit(ctx, &[&dst], &format!("Linked {} to {}", to, from))
    }

    /// Copy a secret or directory prefix inside this store.
    ///
    /// A trailing `/` on a directory source copies its contents into `to`;
    /// without it the directory itself is re-created below an existing `to`.
    /// Returns the number of secrets copied.
    pub fn copy(&self, ctx: &Context, from: &str, to: &str) -> Result<usize> {
        self.transfer(ctx, from, to, false)
    }

    /// Move a secret or directory prefix inside this store.
    ///
    /// Same destination rules as [`Store::copy`]. Returns the number of
    /// secrets moved. Zero matches is a no-op without a commit.
    pub fn rename(&self, ctx: &Context, from: &str, to: &str) -> Result<usize> {
        self.transfer(ctx, from, to, true)
    }

    fn transfer(&self, ctx: &Context, from: &str, to: &str, remove: bool) -> Result<usize> {
        let plan = self.plan(ctx, from, to, self)?;
        if plan.is_empty() {
            debug!(from, "nothing to transfer");
            return Ok(0);
        }

        let mut paths = Vec::with_capacity(plan.len() * 2);
        for (src, dst) in &plan {
            ctx.check_canceled()?;
            let (src_file, dst_file) = (self.passfile(src), self.passfile(dst));
            // same recipients on both ends, the envelope is reused as is
            let blob = self.storage.get(ctx, &src_file)?;
            self.storage.set(ctx, &dst_file, &blob)?;
            if remove {
                self.storage.delete(ctx, &src_file)?;
                paths.push(src_file);
            }
            paths.push(dst_file);
        }

        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        let verb = if remove { "Moved" } else { "Copied" };
        self.commit(ctx, &paths, &format!("{} {} to {}", verb, from, to))?;
        info!(from, to, count = plan.len(), "{} secrets", verb.to_lowercase());
        Ok(plan.len())
    }

    /// Source/destination pairs for moving `from` in this store to `to` in
    /// `dst`. Fails if a secret would land on itself, or if a destination
    /// exists and the context is not forced.
    pub(crate) fn plan(
        &self,
        ctx: &Context,
        from: &str,
        to: &str,
        dst: &Store,
    ) -> Result<Vec<(String, String)>> {
        let src_is_dir = self.is_dir(ctx, from) && !self.exists(ctx, from);
        let names = if src_is_dir {
            let dir = from.trim_matches('/');
            let prefix = if dir.is_empty() {
                String::new()
            } else {
                format!("{}/", dir)
            };
            self.list(ctx, &prefix, None)?
        } else if self.exists(ctx, from) {
            vec![from.trim_matches('/').to_string()]
        } else {
            return Err(StoreError::NotFound(from.to_string()).into());
        };

        let dst_is_dir = to.is_empty() || to.ends_with('/') || dst.is_dir(ctx, to);
        let plan = transfer_plan(from, to, &names, src_is_dir, dst_is_dir);

        // force must never turn a self-transfer into a delete
        if std::ptr::eq(self, dst) {
            if let Some((s, _)) = plan.iter().find(|(s, d)| s == d) {
                return Err(ValidationError::InvalidArgument(format!(
                    "{} would be moved onto itself",
                    s
                ))
                .into());
            }
        }

        if !ctx.is_force() {
            if let Some((_, d)) = plan.iter().find(|(_, d)| dst.exists(ctx, d)) {
                return Err(StoreError::AlreadyExists(d.clone()).into());
            }
        }
        Ok(plan)
    }
}

/// Destination names for a move or copy.
///
/// `names` are the secrets matched by `from` (just `from` itself for a
/// single secret).
pub(crate) fn transfer_plan(
    from: &str,
    to: &str,
    names: &[String],
    src_is_dir: bool,
    dst_is_dir: bool,
) -> Vec<(String, String)> {
    let join = |a: &str, b: &str| {
        let a = a.trim_matches('/');
        if a.is_empty() {
            b.to_string()
        } else {
            format!("{}/{}", a, b)
        }
    };
    let base = |p: &str| {
        p.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    };

    if !src_is_dir {
        let dst = if dst_is_dir {
            join(to, &base(from))
        } else {
            to.trim_matches('/').to_string()
        };
        return names.iter().map(|n| (n.clone(), dst.clone())).collect();
    }

    let src_dir = from.trim_matches('/');
    let flatten = from.ends_with('/');
    names
        .iter()
        .filter_map(|n| {
            let rel = n.strip_prefix(src_dir)?.trim_start_matches('/');
            let dst = if flatten || !dst_is_dir {
                join(to, rel)
            } else {
                join(&join(to, &base(from)), rel)
            };
            Some((n.clone(), dst))
        })
        .collect()
}

fn parse(ctx: &Context, plain: &[u8]) -> Result<Secret> {
    if ctx.is_show_parsing() {
        Secret::parse(plain)
    } else {
        Secret::parse_as(Format::Plain, plain)
    }
}

fn not_found_as(err: Error, name: &str) -> Error {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(name.to_string()).into()
    } else {
        err
    }
}
