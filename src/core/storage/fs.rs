//! Filesystem storage.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{dir_prefix, under_prefix, validate_name, Storage};
use crate::core::context::Context;
use crate::error::{Result, StorageError};

/// Plain directory tree rooted at a sub-store path.
#[derive(Debug, Clone)]
pub struct Fs {
    root: PathBuf,
}

impl Fs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn full(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Remove empty directories from `dir` up to (not including) the root.
    fn remove_empty_parents(&self, mut dir: Option<&Path>) {
        while let Some(d) = dir {
            if d == self.root || !d.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(d).is_err() {
                break;
            }
            debug!(dir = %d.display(), "removed empty directory");
            dir = d.parent();
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.'))
}

impl Storage for Fs {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn path(&self) -> &Path {
        &self.root
    }

    fn get(&self, _ctx: &Context, name: &str) -> Result<Vec<u8>> {
        let path = self.full(name)?;
        fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string()).into()
            } else {
                StorageError::ReadFailed { path, source }.into()
            }
        })
    }

    fn set(&self, _ctx: &Context, name: &str, value: &[u8]) -> Result<()> {
        let mut path = self.full(name)?;
        // write through links so they keep pointing at the shared blob
        if path.is_symlink() {
            if let Ok(target) = fs::canonicalize(&path) {
                path = target;
            }
        }
        let write_err = |source| StorageError::WriteFailed {
            path: path.clone(),
            source,
        };
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(value).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        debug!(name, bytes = value.len(), "stored blob");
        Ok(())
    }

    fn delete(&self, _ctx: &Context, name: &str) -> Result<()> {
        let path = self.full(name)?;
        if path.is_dir() {
            return Err(StorageError::IsDirectory(name.to_string()).into());
        }
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string()).into()
            } else {
                crate::error::Error::from(StorageError::WriteFailed {
                    path: path.clone(),
                    source,
                })
            }
        })?;
        self.remove_empty_parents(path.parent());
        Ok(())
    }

    fn exists(&self, _ctx: &Context, name: &str) -> bool {
        self.full(name)
            .map(|p| p.is_file() || p.is_symlink())
            .unwrap_or(false)
    }

    fn is_dir(&self, _ctx: &Context, name: &str) -> bool {
        let name = name.trim_end_matches('/');
        if name.is_empty() {
            return self.root.is_dir();
        }
        self.full(name).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn list(&self, _ctx: &Context, prefix: &str) -> Result<Vec<String>> {
        // a prefix that names a hidden directory lists inside it
        let (base, show_hidden) = match prefix.split_once('/') {
            Some((head, _)) if head.starts_with('.') => (self.root.join(head), true),
            _ => (self.root.clone(), false),
        };
        if !base.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let walker = WalkDir::new(&base)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| show_hidden || !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if under_prefix(&name, prefix) {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }

    fn prune(&self, _ctx: &Context, prefix: &str) -> Result<()> {
        let dir = dir_prefix(prefix);
        if dir.is_empty() {
            return Err(StorageError::InvalidName("cannot prune the store root".into()).into());
        }
        let path = self.full(dir.trim_end_matches('/'))?;
        if !path.is_dir() {
            return Err(StorageError::NotFound(prefix.to_string()).into());
        }
        fs::remove_dir_all(&path).map_err(|source| StorageError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        self.remove_empty_parents(path.parent());
        debug!(prefix, "pruned");
        Ok(())
    }

    fn link(&self, _ctx: &Context, from: &str, to: &str) -> Result<()> {
        let src = self.full(from)?;
        let dst = self.full(to)?;
        let fail = |reason: String| StorageError::LinkFailed {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        };
        if !src.is_file() {
            return Err(StorageError::NotFound(from.to_string()).into());
        }
        if dst.exists() || dst.is_symlink() {
            return Err(fail("destination exists".into()).into());
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }

        #[cfg(unix)]
        {
            let depth = to.split('/').count() - 1;
            let target = format!("{}{}", "../".repeat(depth), from);
            std::os::unix::fs::symlink(&target, &dst).map_err(|e| fail(e.to_string()))?;
        }
        #[cfg(not(unix))]
        {
            fs::copy(&src, &dst).map_err(|e| fail(e.to_string()))?;
        }

        debug!(from, to, "linked");
        Ok(())
    }

    fn fsck(&self, _ctx: &Context) -> Result<()> {
        if !self.root.is_dir() {
            return Err(StorageError::NotFound(self.root.display().to_string()).into());
        }
        // dangling links are reported, not removed
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .flatten()
        {
            if entry.path_is_symlink() && !entry.path().exists() {
                warn!(path = %entry.path().display(), "dangling link");
            }
        }
        Ok(())
    }
}
