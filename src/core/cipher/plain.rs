//! Passthrough backend without encryption.
//!
//! The envelope is a header line `gpass-plain:<id>,<id>` followed by the
//! plaintext, so recipient drift is still observable. When local identities
//! are configured, decrypt only opens envelopes addressed to one of them.

use parking_lot::RwLock;
use tracing::trace;

use super::Cipher;
use crate::core::context::Context;
use crate::error::{CipherError, Result};

const HEADER: &str = "gpass-plain:";

/// Plain (unencrypted) backend.
#[derive(Default)]
pub struct Plain {
    identities: RwLock<Vec<String>>,
    known: RwLock<Vec<String>>,
}

impl Plain {
    pub fn new(identities: Vec<String>) -> Self {
        Self {
            identities: RwLock::new(identities),
            known: RwLock::new(Vec::new()),
        }
    }

    fn split(ciphertext: &[u8]) -> Result<(Vec<String>, &[u8])> {
        let nl = ciphertext
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| CipherError::DecryptionFailed("missing plain header".into()))?;
        let header = std::str::from_utf8(&ciphertext[..nl])
            .ok()
            .and_then(|h| h.strip_prefix(HEADER))
            .ok_or_else(|| CipherError::DecryptionFailed("missing plain header".into()))?;
        let ids = header
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok((ids, &ciphertext[nl + 1..]))
    }
}

impl Cipher for Plain {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn ext(&self) -> &'static str {
        "txt"
    }

    fn id_file(&self) -> &'static str {
        ".plain-ids"
    }

    fn concurrency(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn encrypt(&self, _ctx: &Context, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        trace!(recipients = recipients.len(), "plain encrypt");
        if recipients.iter().any(|r| r.contains(',') || r.contains('\n')) {
            return Err(CipherError::EncryptionFailed("invalid recipient id".into()).into());
        }
        let mut out = format!("{}{}\n", HEADER, recipients.join(",")).into_bytes();
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    fn decrypt(&self, _ctx: &Context, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let (ids, payload) = Self::split(ciphertext)?;
        let identities = self.identities.read();
        if !identities.is_empty()
            && !ids
                .iter()
                .any(|id| identities.iter().any(|mine| mine.eq_ignore_ascii_case(id)))
        {
            return Err(CipherError::DecryptionFailed(
                "envelope is not addressed to a local identity".into(),
            )
            .into());
        }
        Ok(payload.to_vec())
    }

    fn recipient_ids(&self, _ctx: &Context, ciphertext: &[u8]) -> Result<Vec<String>> {
        Ok(Self::split(ciphertext)?.0)
    }

    fn list_identities(&self, _ctx: &Context) -> Result<Vec<String>> {
        Ok(self.identities.read().clone())
    }

    fn list_recipients(&self, ctx: &Context) -> Result<Vec<String>> {
        let mut out = self.list_identities(ctx)?;
        for id in self.known.read().iter() {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        Ok(out)
    }

    fn generate_identity(
        &self,
        _ctx: &Context,
        name: &str,
        email: &str,
        _passphrase: &str,
    ) -> Result<String> {
        let id = if email.is_empty() {
            name.to_string()
        } else {
            email.to_string()
        };
        if id.is_empty() {
            return Err(CipherError::EncryptionFailed("identity needs a name or email".into()).into());
        }
        self.identities.write().push(id.clone());
        Ok(id)
    }

    fn import_public_key(&self, _ctx: &Context, key: &[u8]) -> Result<String> {
        let id = String::from_utf8_lossy(key).trim().to_string();
        if id.is_empty() {
            return Err(CipherError::InvalidPublicKey("empty key".into()).into());
        }
        let mut known = self.known.write();
        if !known.contains(&id) {
            known.push(id.clone());
        }
        Ok(id)
    }

    fn export_public_key(&self, _ctx: &Context, id: &str) -> Result<Vec<u8>> {
        Ok(format!("{}\n", id).into_bytes())
    }
}
