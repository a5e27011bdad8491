//! Storage backend selection.

use std::path::Path;

use tracing::debug;

use super::{Fs, Git, Memory, Storage};
use crate::error::{Result, StorageError};

/// Registered storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Fs,
    GitFs,
    Memory,
}

impl StorageKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "fs" => Ok(StorageKind::Fs),
            "gitfs" | "git" => Ok(StorageKind::GitFs),
            "inmem" | "memory" => Ok(StorageKind::Memory),
            other => Err(StorageError::UnknownBackend(format!(
                "{}. Supported: fs, gitfs, inmem",
                other
            ))
            .into()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StorageKind::Fs => "fs",
            StorageKind::GitFs => "gitfs",
            StorageKind::Memory => "inmem",
        }
    }

    /// A directory with a `.git` entry uses gitfs, anything else plain fs.
    pub fn detect(path: &Path) -> Self {
        if path.join(".git").exists() {
            StorageKind::GitFs
        } else {
            StorageKind::Fs
        }
    }

    /// Instantiate the backend rooted at `path`.
    pub fn build(self, path: &Path) -> Box<dyn Storage> {
        debug!(backend = self.name(), path = %path.display(), "creating storage backend");
        match self {
            StorageKind::Fs => Box::new(Fs::new(path)),
            StorageKind::GitFs => Box::new(Git::new(path)),
            StorageKind::Memory => Box::new(Memory::with_rcs()),
        }
    }
}
