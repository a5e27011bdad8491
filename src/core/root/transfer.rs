//! Move and copy across the mount table.

use tracing::{debug, info, warn};

use super::{join_alias, RootStore};
use crate::core::context::Context;
use crate::error::{Result, StoreError};

impl RootStore {
    /// Move a secret or directory prefix. Returns the number of secrets
    /// moved.
    ///
    /// Inside one mount this is a single commit. Across mounts every secret
    /// is re-encrypted for the destination recipients, the destination
    /// commits, then the source deletes and commits. A failed delete leaves
    /// a duplicate behind and is reported as a warning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MountPoint` if `from` is a mount alias,
    /// `StoreError::NotFound` if nothing matches `from`, and
    /// `StoreError::AlreadyExists` for an existing destination unless the
    /// context is forced.
    pub fn rename(&self, ctx: &Context, from: &str, to: &str) -> Result<usize> {
        self.transfer(ctx, from, to, true)
    }

    /// Copy a secret or directory prefix. Same rules as
    /// [`RootStore::rename`] without the delete.
    pub fn copy(&self, ctx: &Context, from: &str, to: &str) -> Result<usize> {
        self.transfer(ctx, from, to, false)
    }

    fn transfer(&self, ctx: &Context, from: &str, to: &str, remove: bool) -> Result<usize> {
        if self.is_mount_point(from) {
            return Err(StoreError::MountPoint(from.to_string()).into());
        }
        let (src, src_rel) = self.route(from)?;
        let (dst, dst_rel) = self.route(to)?;

        if src.alias() == dst.alias() {
            return if remove {
                src.rename(ctx, &src_rel, &dst_rel)
            } else {
                src.copy(ctx, &src_rel, &dst_rel)
            };
        }

        debug!(from, to, src = src.alias(), dst = dst.alias(), "cross-mount transfer");
        let plan = src.plan(ctx, &src_rel, &dst_rel, dst)?;
        if plan.is_empty() {
            debug!(from, "nothing to transfer");
            return Ok(0);
        }

        let bulk = ctx.with_commit(false);
        let mut written = Vec::with_capacity(plan.len());
        for (s, d) in &plan {
            ctx.check_canceled()?;
            let secret = src.get(ctx, s)?;
            dst.set(&bulk, d, &secret)?;
            written.push(dst.passfile(d));
        }
        let verb = if remove { "Moved" } else { "Copied" };
        let paths: Vec<&str> = written.iter().map(String::as_str).collect();
        dst.commit(
            ctx,
            &paths,
            &format!("{} {} to {}", verb, join_alias(src.alias(), &src_rel), to),
        )?;

        if remove {
            let mut removed = Vec::with_capacity(plan.len());
            for (s, _) in &plan {
                match src.delete(&bulk, s) {
                    Ok(()) => removed.push(src.passfile(s)),
                    Err(e) => warn!(
                        secret = %join_alias(src.alias(), s),
                        "copied but could not remove the source, it now exists twice: {}",
                        e
                    ),
                }
            }
            if !removed.is_empty() {
                let paths: Vec<&str> = removed.iter().map(String::as_str).collect();
                src.commit(ctx, &paths, &format!("Moved {} to {}", from, to))?;
            }
        }

        info!(from, to, count = plan.len(), "{} secrets across mounts", verb.to_lowercase());
        Ok(plan.len())
    }
}
