//! Storage backends.
//!
//! A storage backend holds the encrypted blobs of one sub-store. Names are
//! relative, `/`-separated, and include the crypto suffix (`web/mail.age`).
//! Revision control is an optional capability: the default RCS methods fail
//! with `RcsError::NotInitialized`, which callers treat as "no history".
//!
//! ## Backends
//!
//! - **fs**: plain directory tree
//! - **gitfs**: fs plus the git CLI for history and sync
//! - **inmem**: process-local map with a simulated commit log

use std::path::Path;

use tracing::debug;

use crate::core::context::Context;
use crate::core::types::Revision;
use crate::error::{Error, RcsError, Result, StorageError};

mod backend;
mod fs;
mod git;
mod memory;

pub use backend::StorageKind;
pub use fs::Fs;
pub use git::Git;
pub use memory::Memory;

/// Storage backend contract.
pub trait Storage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Root of the sub-store on disk (virtual for in-memory storage).
    fn path(&self) -> &Path;

    /// Read a blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob does not exist.
    fn get(&self, ctx: &Context, name: &str) -> Result<Vec<u8>>;

    /// Write a blob. Readers see either the old or the new content.
    fn set(&self, ctx: &Context, name: &str, value: &[u8]) -> Result<()>;

    /// Remove a blob. Empty parent directories are removed too.
    fn delete(&self, ctx: &Context, name: &str) -> Result<()>;

    fn exists(&self, ctx: &Context, name: &str) -> bool;

    fn is_dir(&self, ctx: &Context, name: &str) -> bool;

    /// Sorted blob names under `prefix`. Hidden entries are skipped.
    fn list(&self, ctx: &Context, prefix: &str) -> Result<Vec<String>>;

    /// Remove a directory prefix and everything below it.
    fn prune(&self, ctx: &Context, prefix: &str) -> Result<()>;

    /// Make `to` resolve to the blob at `from`.
    fn link(&self, ctx: &Context, from: &str, to: &str) -> Result<()>;

    /// Backend-specific integrity check and repair.
    fn fsck(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    // --- Revision control ---

    /// Initialize revision control in the store.
    fn init_rcs(&self, _ctx: &Context, _name: &str, _email: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn add(&self, _ctx: &Context, _paths: &[&str]) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn commit(&self, _ctx: &Context, _message: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn push(&self, _ctx: &Context, _remote: &str, _branch: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn pull(&self, _ctx: &Context, _remote: &str, _branch: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn add_remote(&self, _ctx: &Context, _remote: &str, _url: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    fn remove_remote(&self, _ctx: &Context, _remote: &str) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }

    /// History of `name`, newest first.
    fn revisions(&self, _ctx: &Context, _name: &str) -> Result<Vec<Revision>> {
        Err(RcsError::NotInitialized.into())
    }

    fn get_revision(&self, _ctx: &Context, _name: &str, _rev: &str) -> Result<Vec<u8>> {
        Err(RcsError::NotInitialized.into())
    }

    fn status(&self, _ctx: &Context) -> Result<String> {
        Err(RcsError::NotInitialized.into())
    }

    fn compact(&self, _ctx: &Context) -> Result<()> {
        Err(RcsError::NotInitialized.into())
    }
}

/// True for RCS conditions that a write path tolerates.
pub(crate) fn is_benign_rcs(err: &Error) -> bool {
    matches!(
        err,
        Error::Rcs(RcsError::NotInitialized)
            | Error::Rcs(RcsError::NothingToCommit)
            | Error::Rcs(RcsError::NoRemote(_))
    )
}

/// Swallow benign RCS conditions, propagate everything else.
pub(crate) fn tolerate(op: &str, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if is_benign_rcs(&e) => {
            debug!(op, "{}", e);
            Ok(())
        }
        other => other,
    }
}

/// Reject names that would escape the store root.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name
            .split('/')
            .any(|c| c.is_empty() || c == "." || c == "..");
    if bad {
        return Err(StorageError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// Normalize a directory prefix: no leading slash, trailing slash if non-empty.
pub(crate) fn dir_prefix(prefix: &str) -> String {
    let p = prefix.trim_matches('/');
    if p.is_empty() {
        String::new()
    } else {
        format!("{}/", p)
    }
}

/// Whether `name` lies under `prefix`, compared by path component.
///
/// `"a"` matches `a` and `a/x` but not `ab/x`; `"a/"` matches only entries
/// below `a`.
pub(crate) fn under_prefix(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() || prefix.ends_with('/') {
        return name.starts_with(prefix);
    }
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
