//! Crypto backend selection.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Age, Cipher, Plain};
use crate::core::config::{expand_home, Config};
use crate::error::{CipherError, Result};

/// Registered crypto backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Age,
    Gpg,
    Plain,
}

impl CipherKind {
    pub const ALL: [CipherKind; 3] = [CipherKind::Age, CipherKind::Gpg, CipherKind::Plain];

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "age" => Ok(CipherKind::Age),
            "gpg" | "gpgcli" => Ok(CipherKind::Gpg),
            "plain" => Ok(CipherKind::Plain),
            other => Err(CipherError::UnknownBackend(format!(
                "{}. Supported: age, gpg, plain",
                other
            ))
            .into()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherKind::Age => "age",
            CipherKind::Gpg => "gpg",
            CipherKind::Plain => "plain",
        }
    }

    /// Recipient file basename used by this backend.
    pub fn id_file(self) -> &'static str {
        match self {
            CipherKind::Age => ".age-recipients",
            CipherKind::Gpg => ".gpg-id",
            CipherKind::Plain => ".plain-ids",
        }
    }

    /// Pick a backend from the recipient file present at `path`.
    pub fn detect(path: &Path) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| path.join(k.id_file()).is_file())
    }

    /// Instantiate the backend.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::BackendUnavailable` if the backend is not
    /// compiled in or its tooling is missing.
    pub fn build(self, config: &Config) -> Result<Box<dyn Cipher>> {
        debug!(backend = self.name(), "creating cipher backend");
        match self {
            CipherKind::Age => {
                let dir = config
                    .get("age.keyring")
                    .map(|p| PathBuf::from(expand_home(&p)))
                    .or_else(Age::default_dir)
                    .ok_or_else(|| {
                        CipherError::BackendUnavailable("cannot locate the age keyring".into())
                    })?;
                Ok(Box::new(Age::open(&dir)?))
            }
            CipherKind::Plain => Ok(Box::new(Plain::new(vec![whoami::username()]))),
            CipherKind::Gpg => {
                #[cfg(feature = "gpg")]
                {
                    Ok(Box::new(super::Gpg::new()?))
                }
                #[cfg(not(feature = "gpg"))]
                {
                    Err(CipherError::BackendUnavailable(
                        "GPG support not compiled. Rebuild with: cargo install gpass --features gpg"
                            .to_string(),
                    )
                    .into())
                }
            }
        }
    }
}
