//! Test support utilities for gpass integration tests.
//!
//! Provides reusable test environment setup and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;

#[allow(unused_imports)]
pub use assertions::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own store dir and home dir. Child processes see them
/// through env vars only, so tests can run in parallel.
pub struct Test {
    /// Holds the stores and the user config
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Create a test environment with a plain root store initialized.
    pub fn init() -> Self {
        let t = Self::new();
        let output = t.init_cmd("", &t.store_path(""));
        assert!(
            output.status.success(),
            "Failed to initialize store: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Create an initialized test environment holding `secrets`.
    pub fn with_secrets(secrets: &[(&str, &str)]) -> Self {
        let t = Self::init();
        for (name, password) in secrets {
            let output = t.insert(name, password);
            assert!(
                output.status.success(),
                "Failed to insert {}: {}",
                name,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        t
    }

    /// Directory of the store mounted at `alias` (`""` for root).
    pub fn store_path(&self, alias: &str) -> PathBuf {
        let leaf = if alias.is_empty() { "root" } else { alias };
        self.dir.path().join("stores").join(leaf)
    }

    /// Directory holding the user config file.
    pub fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }
}
