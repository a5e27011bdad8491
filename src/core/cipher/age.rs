//! Age encryption backend.
//!
//! Identities and known recipients live in a keyring directory:
//!
//! - `identities`: `AGE-SECRET-KEY-1...` lines, each optionally preceded by a
//!   `# name <email>` comment. Mode 0600 on Unix.
//! - `recipients`: `age1... # label` lines for other people's public keys.
//!
//! Envelopes are ASCII armored.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ::age::secrecy::ExposeSecret;
use ::age::x25519;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::Cipher;
use crate::core::config::write_atomic;
use crate::core::context::Context;
use crate::error::{CipherError, Result, StorageError};

const IDENTITIES_FILE: &str = "identities";
const RECIPIENTS_FILE: &str = "recipients";

struct Keyring {
    identities: Vec<(x25519::Identity, String)>,
    recipients: Vec<(String, String)>,
}

/// Age-based backend using x25519 keys.
pub struct Age {
    dir: Option<PathBuf>,
    keyring: RwLock<Keyring>,
}

impl Age {
    /// Open (or lazily create) the keyring at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidPublicKey` if a keyring file has a
    /// malformed line.
    pub fn open(dir: &Path) -> Result<Self> {
        let identities = read_identities(&dir.join(IDENTITIES_FILE))?;
        let recipients = read_recipients(&dir.join(RECIPIENTS_FILE))?;
        debug!(
            dir = %dir.display(),
            identities = identities.len(),
            recipients = recipients.len(),
            "opened age keyring"
        );
        Ok(Self {
            dir: Some(dir.to_path_buf()),
            keyring: RwLock::new(Keyring {
                identities,
                recipients,
            }),
        })
    }

    /// In-memory keyring holding the given identities.
    pub fn with_identities(identities: Vec<x25519::Identity>) -> Self {
        Self {
            dir: None,
            keyring: RwLock::new(Keyring {
                identities: identities.into_iter().map(|i| (i, String::new())).collect(),
                recipients: Vec::new(),
            }),
        }
    }

    /// Default keyring directory under the user config dir.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::core::constants::APP_DIR).join("age"))
    }

    fn persist(&self, keyring: &Keyring) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let mut ids = String::new();
        for (identity, label) in &keyring.identities {
            if !label.is_empty() {
                ids.push_str(&format!("# {}\n", label));
            }
            ids.push_str(identity.to_string().expose_secret());
            ids.push('\n');
        }
        let path = dir.join(IDENTITIES_FILE);
        write_atomic(&path, &ids)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|source| {
                StorageError::WriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;
        }

        let mut recips = String::new();
        for (id, label) in &keyring.recipients {
            if label.is_empty() {
                recips.push_str(&format!("{}\n", id));
            } else {
                recips.push_str(&format!("{} # {}\n", id, label));
            }
        }
        write_atomic(&dir.join(RECIPIENTS_FILE), &recips)
    }
}

impl Cipher for Age {
    fn name(&self) -> &'static str {
        "age"
    }

    fn ext(&self) -> &'static str {
        "age"
    }

    fn id_file(&self) -> &'static str {
        ".age-recipients"
    }

    fn concurrency(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn encrypt(&self, ctx: &Context, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting"
        );

        let mut parsed = Vec::with_capacity(recipients.len());
        for r in recipients {
            match r.parse::<x25519::Recipient>() {
                Ok(k) => parsed.push(k),
                Err(e) if ctx.is_force() => warn!(recipient = %r, "skipping unusable recipient: {}", e),
                Err(e) => {
                    return Err(
                        CipherError::EncryptionFailed(format!("recipient {}: {}", r, e)).into(),
                    )
                }
            }
        }
        if parsed.is_empty() {
            return Err(CipherError::EncryptionFailed("no usable recipients".into()).into());
        }

        let encryptor =
            ::age::Encryptor::with_recipients(parsed.iter().map(|r| r as &dyn ::age::Recipient))
                .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        let mut encrypted = Vec::new();
        let mut writer = encryptor
            .wrap_output(::age::armor::ArmoredWriter::wrap_output(
                &mut encrypted,
                ::age::armor::Format::AsciiArmor,
            )?)
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        writer.write_all(plaintext)?;
        let armored = writer
            .finish()
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
        armored
            .finish()
            .map_err(|e| CipherError::ArmorFailed(format!("{}", e)))?;

        trace!(ciphertext_len = encrypted.len(), "encrypted");
        Ok(encrypted)
    }

    fn decrypt(&self, _ctx: &Context, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting");

        let keyring = self.keyring.read();
        if keyring.identities.is_empty() {
            return Err(CipherError::DecryptionFailed("no age identities in keyring".into()).into());
        }

        let reader = ::age::armor::ArmoredReader::new(ciphertext);
        let decryptor = ::age::Decryptor::new(reader)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        let mut decrypted = Vec::new();
        let mut reader = decryptor
            .decrypt(
                keyring
                    .identities
                    .iter()
                    .map(|(i, _)| i as &dyn ::age::Identity),
            )
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        trace!(plaintext_len = decrypted.len(), "decrypted");
        Ok(decrypted)
    }

    fn list_identities(&self, _ctx: &Context) -> Result<Vec<String>> {
        let keyring = self.keyring.read();
        Ok(keyring
            .identities
            .iter()
            .map(|(i, _)| i.to_public().to_string())
            .collect())
    }

    fn list_recipients(&self, ctx: &Context) -> Result<Vec<String>> {
        let mut out = self.list_identities(ctx)?;
        let keyring = self.keyring.read();
        for (id, _) in &keyring.recipients {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        Ok(out)
    }

    fn find_recipients(&self, ctx: &Context, query: &str) -> Result<Vec<String>> {
        // a well-formed public key resolves to itself
        if let Ok(r) = query.trim().parse::<x25519::Recipient>() {
            return Ok(vec![r.to_string()]);
        }
        let q = query.to_lowercase();
        Ok(self
            .list_recipients(ctx)?
            .into_iter()
            .filter(|id| self.describe(id).to_lowercase().contains(&q))
            .collect())
    }

    fn describe(&self, id: &str) -> String {
        let keyring = self.keyring.read();
        let label = keyring
            .identities
            .iter()
            .find(|(i, _)| i.to_public().to_string() == id)
            .map(|(_, l)| l.clone())
            .or_else(|| {
                keyring
                    .recipients
                    .iter()
                    .find(|(r, _)| r == id)
                    .map(|(_, l)| l.clone())
            })
            .unwrap_or_default();
        if label.is_empty() {
            id.to_string()
        } else {
            format!("{} ({})", id, label)
        }
    }

    fn generate_identity(
        &self,
        _ctx: &Context,
        name: &str,
        email: &str,
        passphrase: &str,
    ) -> Result<String> {
        if !passphrase.is_empty() {
            debug!("age keyring identities are not passphrase protected");
        }
        let identity = x25519::Identity::generate();
        let public = identity.to_public().to_string();
        let label = match (name.is_empty(), email.is_empty()) {
            (true, true) => String::new(),
            (false, true) => name.to_string(),
            (true, false) => format!("<{}>", email),
            (false, false) => format!("{} <{}>", name, email),
        };

        let mut keyring = self.keyring.write();
        keyring.identities.push((identity, label));
        self.persist(&keyring)?;
        debug!(recipient = %public, "generated age identity");
        Ok(public)
    }

    fn import_public_key(&self, _ctx: &Context, key: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(key);
        let line = text.lines().map(str::trim).find(|l| !l.is_empty() && !l.starts_with('#'));
        let line = line.ok_or_else(|| CipherError::InvalidPublicKey("empty key".into()))?;
        let (id, label) = match line.split_once('#') {
            Some((id, label)) => (id.trim(), label.trim()),
            None => (line, ""),
        };
        id.parse::<x25519::Recipient>()
            .map_err(|_| CipherError::InvalidPublicKey(id.to_string()))?;

        let mut keyring = self.keyring.write();
        if !keyring.recipients.iter().any(|(r, _)| r == id) {
            keyring.recipients.push((id.to_string(), label.to_string()));
            self.persist(&keyring)?;
        }
        Ok(id.to_string())
    }

    fn export_public_key(&self, _ctx: &Context, id: &str) -> Result<Vec<u8>> {
        id.parse::<x25519::Recipient>()
            .map_err(|_| CipherError::InvalidPublicKey(id.to_string()))?;
        let desc = self.describe(id);
        let label = desc
            .strip_prefix(id)
            .map(|l| l.trim().trim_start_matches('(').trim_end_matches(')'))
            .unwrap_or_default();
        Ok(if label.is_empty() {
            format!("{}\n", id).into_bytes()
        } else {
            format!("{} # {}\n", id, label).into_bytes()
        })
    }
}

fn read_identities(path: &Path) -> Result<Vec<(x25519::Identity, String)>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }
            .into())
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                warn!(path = %path.display(), mode = format!("{:o}", mode), "age identities are readable by others");
            }
        }
    }

    let mut out = Vec::new();
    let mut label = String::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            label = comment.trim().to_string();
            continue;
        }
        let identity = line
            .parse::<x25519::Identity>()
            .map_err(|e: &str| CipherError::InvalidPublicKey(format!("identity: {}", e)))?;
        out.push((identity, std::mem::take(&mut label)));
    }
    Ok(out)
}

fn read_recipients(path: &Path) -> Result<Vec<(String, String)>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }
            .into())
        }
    };
    let mut out = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (id, label) = match line.split_once('#') {
            Some((id, label)) => (id.trim(), label.trim()),
            None => (line, ""),
        };
        id.parse::<x25519::Recipient>()
            .map_err(|_| CipherError::InvalidPublicKey(id.to_string()))?;
        out.push((id.to_string(), label.to_string()));
    }
    Ok(out)
}
