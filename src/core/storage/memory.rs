//! In-memory storage with a simulated revision history.
//!
//! Used by tests and dry runs. Commits snapshot the whole blob map so
//! `get_revision` can serve any past state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{dir_prefix, under_prefix, validate_name, Storage};
use crate::core::context::Context;
use crate::core::types::Revision;
use crate::error::{RcsError, Result, StorageError};

#[derive(Debug, Clone)]
struct Commit {
    revision: Revision,
    touched: BTreeSet<String>,
    snapshot: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct Rcs {
    staged: BTreeSet<String>,
    commits: Vec<Commit>,
    remotes: BTreeMap<String, String>,
    pushes: usize,
}

#[derive(Debug, Default)]
struct State {
    blobs: BTreeMap<String, Vec<u8>>,
    /// link name -> target name
    links: BTreeMap<String, String>,
    rcs: Option<Rcs>,
}

impl State {
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.links.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Process-local storage.
#[derive(Debug)]
pub struct Memory {
    root: PathBuf,
    state: RwLock<State>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("inmem://"),
            state: RwLock::new(State::default()),
        }
    }

    /// Storage with revision control already initialized.
    pub fn with_rcs() -> Self {
        let m = Self::new();
        m.state.write().rcs = Some(Rcs::default());
        m
    }

    /// Number of commits recorded so far.
    pub fn commit_count(&self) -> usize {
        self.state
            .read()
            .rcs
            .as_ref()
            .map_or(0, |r| r.commits.len())
    }

    /// Subject of the newest commit.
    pub fn last_commit_message(&self) -> Option<String> {
        self.state
            .read()
            .rcs
            .as_ref()
            .and_then(|r| r.commits.last())
            .map(|c| c.revision.subject.clone())
    }

    /// Number of successful pushes.
    pub fn push_count(&self) -> usize {
        self.state.read().rcs.as_ref().map_or(0, |r| r.pushes)
    }
}

impl Storage for Memory {
    fn name(&self) -> &'static str {
        "inmem"
    }

    fn path(&self) -> &Path {
        &self.root
    }

    fn get(&self, _ctx: &Context, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        let state = self.state.read();
        state
            .blobs
            .get(state.resolve(name))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()).into())
    }

    fn set(&self, _ctx: &Context, name: &str, value: &[u8]) -> Result<()> {
        validate_name(name)?;
        let mut state = self.state.write();
        let target = state.resolve(name).to_string();
        state.blobs.insert(target, value.to_vec());
        Ok(())
    }

    fn delete(&self, ctx: &Context, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.is_dir(ctx, name) {
            return Err(StorageError::IsDirectory(name.to_string()).into());
        }
        let mut state = self.state.write();
        if state.links.remove(name).is_some() {
            return Ok(());
        }
        state
            .blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()).into())
    }

    fn exists(&self, _ctx: &Context, name: &str) -> bool {
        let state = self.state.read();
        state.blobs.contains_key(name) || state.links.contains_key(name)
    }

    fn is_dir(&self, _ctx: &Context, name: &str) -> bool {
        let prefix = dir_prefix(name);
        let state = self.state.read();
        if prefix.is_empty() {
            return true;
        }
        state
            .blobs
            .keys()
            .chain(state.links.keys())
            .any(|k| k.starts_with(&prefix))
    }

    fn list(&self, _ctx: &Context, prefix: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        let mut out: Vec<String> = state
            .blobs
            .keys()
            .chain(state.links.keys())
            .filter(|k| under_prefix(k, prefix))
            .filter(|k| prefix.starts_with('.') || !k.split('/').any(|c| c.starts_with('.')))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn prune(&self, _ctx: &Context, prefix: &str) -> Result<()> {
        let dir = dir_prefix(prefix);
        if dir.is_empty() {
            return Err(StorageError::InvalidName("cannot prune the store root".into()).into());
        }
        let mut state = self.state.write();
        let before = state.blobs.len() + state.links.len();
        state.blobs.retain(|k, _| !k.starts_with(&dir));
        state.links.retain(|k, _| !k.starts_with(&dir));
        if before == state.blobs.len() + state.links.len() {
            return Err(StorageError::NotFound(prefix.to_string()).into());
        }
        Ok(())
    }

    fn link(&self, _ctx: &Context, from: &str, to: &str) -> Result<()> {
        validate_name(from)?;
        validate_name(to)?;
        let mut state = self.state.write();
        if !state.blobs.contains_key(from) {
            return Err(StorageError::NotFound(from.to_string()).into());
        }
        if state.blobs.contains_key(to) || state.links.contains_key(to) {
            return Err(StorageError::LinkFailed {
                from: from.to_string(),
                to: to.to_string(),
                reason: "destination exists".into(),
            }
            .into());
        }
        state.links.insert(to.to_string(), from.to_string());
        Ok(())
    }

    fn init_rcs(&self, _ctx: &Context, _name: &str, _email: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.rcs.is_none() {
            state.rcs = Some(Rcs::default());
        }
        Ok(())
    }

    fn add(&self, _ctx: &Context, paths: &[&str]) -> Result<()> {
        let mut state = self.state.write();
        let rcs = state.rcs.as_mut().ok_or(RcsError::NotInitialized)?;
        rcs.staged.extend(paths.iter().map(|p| p.to_string()));
        Ok(())
    }

    fn commit(&self, ctx: &Context, message: &str) -> Result<()> {
        let mut state = self.state.write();
        let snapshot = state.blobs.clone();
        let rcs = state.rcs.as_mut().ok_or(RcsError::NotInitialized)?;
        if rcs.staged.is_empty() {
            return Err(RcsError::NothingToCommit.into());
        }

        let mut hasher = Sha256::new();
        hasher.update(rcs.commits.len().to_le_bytes());
        hasher.update(message.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        let (subject, body) = match message.split_once('\n') {
            Some((s, b)) => (s.to_string(), b.trim().to_string()),
            None => (message.to_string(), String::new()),
        };
        let revision = Revision {
            hash: hash[..40].to_string(),
            author_name: ctx.username().unwrap_or("gpass").to_string(),
            author_email: ctx.email().unwrap_or("gpass@localhost").to_string(),
            date: ctx.commit_timestamp(),
            subject,
            body,
        };
        debug!(rev = %revision.hash, "committed");
        let touched = std::mem::take(&mut rcs.staged);
        rcs.commits.push(Commit {
            revision,
            touched,
            snapshot,
        });
        Ok(())
    }

    fn push(&self, ctx: &Context, remote: &str, _branch: &str) -> Result<()> {
        if ctx.is_no_network() {
            debug!("network disabled, skipping push");
            return Ok(());
        }
        let mut state = self.state.write();
        let rcs = state.rcs.as_mut().ok_or(RcsError::NotInitialized)?;
        if !rcs.remotes.contains_key(remote) {
            return Err(RcsError::NoRemote(remote.to_string()).into());
        }
        rcs.pushes += 1;
        Ok(())
    }

    fn pull(&self, ctx: &Context, remote: &str, _branch: &str) -> Result<()> {
        if ctx.is_no_network() {
            return Ok(());
        }
        let state = self.state.read();
        let rcs = state.rcs.as_ref().ok_or(RcsError::NotInitialized)?;
        if !rcs.remotes.contains_key(remote) {
            return Err(RcsError::NoRemote(remote.to_string()).into());
        }
        Ok(())
    }

    fn add_remote(&self, _ctx: &Context, remote: &str, url: &str) -> Result<()> {
        let mut state = self.state.write();
        let rcs = state.rcs.as_mut().ok_or(RcsError::NotInitialized)?;
        rcs.remotes.insert(remote.to_string(), url.to_string());
        Ok(())
    }

    fn remove_remote(&self, _ctx: &Context, remote: &str) -> Result<()> {
        let mut state = self.state.write();
        let rcs = state.rcs.as_mut().ok_or(RcsError::NotInitialized)?;
        rcs.remotes
            .remove(remote)
            .map(|_| ())
            .ok_or_else(|| RcsError::NoRemote(remote.to_string()).into())
    }

    fn revisions(&self, _ctx: &Context, name: &str) -> Result<Vec<Revision>> {
        let state = self.state.read();
        let rcs = state.rcs.as_ref().ok_or(RcsError::NotInitialized)?;
        Ok(rcs
            .commits
            .iter()
            .rev()
            .filter(|c| c.touched.contains(name))
            .map(|c| c.revision.clone())
            .collect())
    }

    fn get_revision(&self, _ctx: &Context, name: &str, rev: &str) -> Result<Vec<u8>> {
        let state = self.state.read();
        let rcs = state.rcs.as_ref().ok_or(RcsError::NotInitialized)?;
        rcs.commits
            .iter()
            .find(|c| c.revision.hash.starts_with(rev) && !rev.is_empty())
            .and_then(|c| c.snapshot.get(name).cloned())
            .ok_or_else(|| {
                RcsError::UnknownRevision {
                    name: name.to_string(),
                    rev: rev.to_string(),
                }
                .into()
            })
    }

    fn status(&self, _ctx: &Context) -> Result<String> {
        let state = self.state.read();
        let rcs = state.rcs.as_ref().ok_or(RcsError::NotInitialized)?;
        Ok(rcs
            .staged
            .iter()
            .map(|s| format!("M  {}\n", s))
            .collect())
    }

    fn compact(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}
