//! Crypto backends.
//!
//! A sub-store binds exactly one [`Cipher`]. The store never interprets
//! recipient strings; it hands them to the backend, which decides what a
//! recipient means.
//!
//! ## Backends
//!
//! - **age**: Default, always available. x25519 keys from a local keyring.
//! - **gpg**: Feature-gated (`gpg`). Uses GnuPG via the gpg CLI.
//! - **plain**: No encryption. Recipients are recorded but carry no meaning.

use crate::core::context::Context;
use crate::error::{CipherError, Result};

mod age;
mod backend;
#[cfg(feature = "gpg")]
mod gpg;
mod plain;

pub use self::age::Age;
pub use backend::CipherKind;
#[cfg(feature = "gpg")]
pub use gpg::Gpg;
pub use plain::Plain;

/// Crypto backend contract.
///
/// Every method takes the call context first. Implementations must not retry
/// internally; a missing daemon or token surfaces as
/// `CipherError::BackendUnavailable`.
pub trait Cipher: Send + Sync {
    /// Backend tag. `"plain"` means no encryption.
    fn name(&self) -> &'static str;

    /// Filename suffix for encrypted blobs, without the dot.
    fn ext(&self) -> &'static str;

    /// Basename of the recipient list file inside a sub-store.
    fn id_file(&self) -> &'static str;

    /// Suggested number of concurrent operations.
    fn concurrency(&self) -> usize {
        1
    }

    /// Encrypt `plaintext` for every recipient.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` if a recipient is unusable,
    /// unless the context is in force mode, which skips bad recipients.
    fn encrypt(&self, ctx: &Context, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>>;

    /// Decrypt an envelope with any local identity.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` if no identity opens it.
    fn decrypt(&self, ctx: &Context, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Recipients addressed by an envelope, if the format exposes them.
    fn recipient_ids(&self, _ctx: &Context, _ciphertext: &[u8]) -> Result<Vec<String>> {
        Err(CipherError::NotSupported {
            backend: self.name(),
            op: "recipient_ids",
        }
        .into())
    }

    /// Identities with a private half available locally, in stable order.
    fn list_identities(&self, ctx: &Context) -> Result<Vec<String>>;

    /// Known public keys, with or without a private half.
    fn list_recipients(&self, ctx: &Context) -> Result<Vec<String>>;

    /// Case-insensitive substring search over known recipients.
    fn find_recipients(&self, ctx: &Context, query: &str) -> Result<Vec<String>> {
        let q = query.to_lowercase();
        Ok(self
            .list_recipients(ctx)?
            .into_iter()
            .filter(|id| self.describe(id).to_lowercase().contains(&q))
            .collect())
    }

    /// Case-insensitive substring search over local identities.
    fn find_identities(&self, ctx: &Context, query: &str) -> Result<Vec<String>> {
        let q = query.to_lowercase();
        Ok(self
            .list_identities(ctx)?
            .into_iter()
            .filter(|id| self.describe(id).to_lowercase().contains(&q))
            .collect())
    }

    /// Searchable description of a key: id plus any name or email.
    fn describe(&self, id: &str) -> String {
        id.to_string()
    }

    /// Canonical form of a key id.
    fn fingerprint(&self, _ctx: &Context, id: &str) -> String {
        id.to_string()
    }

    /// Render a key for display. `{id}` and `{desc}` are substituted.
    fn format_key(&self, ctx: &Context, id: &str, template: &str) -> String {
        template
            .replace("{id}", &self.fingerprint(ctx, id))
            .replace("{desc}", &self.describe(id))
    }

    /// Create and store a new identity. Returns its recipient id.
    fn generate_identity(
        &self,
        ctx: &Context,
        name: &str,
        email: &str,
        passphrase: &str,
    ) -> Result<String>;

    /// Add a public key to the local keyring. Returns its id.
    fn import_public_key(&self, ctx: &Context, key: &[u8]) -> Result<String>;

    /// Serialize the public key for `id`.
    fn export_public_key(&self, ctx: &Context, id: &str) -> Result<Vec<u8>>;
}
