//! GPG crypto backend.
//!
//! Drives the `gpg` CLI. Enable with `--features gpg`.
//!
//! ## Requirements
//!
//! - `gpg2` or `gpg` on `PATH`
//! - recipient public keys in the keyring (or exported into the store for
//!   autoimport)
//! - a private key (possibly behind gpg-agent) for decryption

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, trace, warn};

use super::Cipher;
use crate::core::context::Context;
use crate::error::{CipherError, Result};

/// GPG backend using the gpg CLI.
pub struct Gpg {
    binary: PathBuf,
    /// Alternate GNUPGHOME.
    home: Option<PathBuf>,
}

impl Gpg {
    /// Locate the gpg binary.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::BackendUnavailable` if neither `gpg2` nor `gpg`
    /// is installed.
    pub fn new() -> Result<Self> {
        let binary = which::which("gpg2")
            .or_else(|_| which::which("gpg"))
            .map_err(|_| {
                CipherError::BackendUnavailable(
                    "gpg not found. Install GnuPG from https://gnupg.org/download/".to_string(),
                )
            })?;
        debug!(binary = %binary.display(), "using gpg");
        Ok(Self { binary, home: None })
    }

    /// Use a dedicated GNUPGHOME.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = Some(home);
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(home) = &self.home {
            cmd.env("GNUPGHOME", home);
        }
        cmd.args(["--batch", "--no-tty"]);
        cmd
    }

    fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<std::process::Output> {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| CipherError::BackendUnavailable(format!("failed to spawn gpg: {}", e)))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }

        Ok(child.wait_with_output()?)
    }

    /// Parse `--with-colons` output into fingerprints with their user ids.
    fn list_keys(&self, secret: bool, query: Option<&str>) -> Result<Vec<(String, String)>> {
        let mode = if secret {
            "--list-secret-keys"
        } else {
            "--list-keys"
        };
        let mut args = vec!["--with-colons", "--fixed-list-mode", mode];
        if let Some(q) = query {
            args.push(q);
        }
        let output = self.run(&args, None)?;
        if !output.status.success() {
            // gpg exits non-zero when a query matches nothing
            return Ok(Vec::new());
        }

        Ok(parse_colons(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Fingerprints with their first user id from `--with-colons` output.
/// Revoked and expired keys are skipped.
fn parse_colons(text: &str) -> Vec<(String, String)> {
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut want_fpr = false;
    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") | Some("sec") => {
                let revoked_or_expired = matches!(fields.get(1), Some(&"r") | Some(&"e"));
                want_fpr = !revoked_or_expired;
            }
            Some("fpr") if want_fpr => {
                if let Some(fpr) = fields.get(9) {
                    keys.push((fpr.to_string(), String::new()));
                }
                want_fpr = false;
            }
            Some("uid") if !keys.is_empty() => {
                if let (Some(last), Some(uid)) = (keys.last_mut(), fields.get(9)) {
                    if last.1.is_empty() {
                        last.1 = uid.to_string();
                    }
                }
            }
            _ => {}
        }
    }
    keys
}

/// Key ids from `ENC_TO` status lines.
fn parse_enc_to(status: &str) -> Vec<String> {
    status
        .lines()
        .filter_map(|l| l.strip_prefix("[GNUPG:] ENC_TO "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|id| format!("0x{}", id))
        .collect()
}

impl Cipher for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn ext(&self) -> &'static str {
        "gpg"
    }

    fn id_file(&self) -> &'static str {
        ".gpg-id"
    }

    fn encrypt(&self, ctx: &Context, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting with gpg"
        );
        if recipients.is_empty() {
            return Err(CipherError::EncryptionFailed("no recipients provided".to_string()).into());
        }

        let mut usable = Vec::with_capacity(recipients.len());
        for r in recipients {
            if self.list_keys(false, Some(r))?.is_empty() {
                if ctx.is_force() {
                    warn!(recipient = %r, "skipping unknown recipient");
                    continue;
                }
                return Err(CipherError::EncryptionFailed(format!("unknown recipient {}", r)).into());
            }
            usable.push(r.as_str());
        }
        if usable.is_empty() {
            return Err(CipherError::EncryptionFailed("no usable recipients".into()).into());
        }

        let mut args = vec!["--yes", "--trust-model", "always", "--encrypt"];
        for r in usable {
            args.push("--recipient");
            args.push(r);
        }
        let output = self.run(&args, Some(plaintext))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::EncryptionFailed(format!("gpg encrypt failed: {}", stderr)).into());
        }

        trace!(ciphertext_len = output.stdout.len(), "encrypted with gpg");
        Ok(output.stdout)
    }

    fn decrypt(&self, _ctx: &Context, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with gpg");
        let output = self.run(&["--quiet", "--decrypt"], Some(ciphertext))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("agent") && stderr.contains("connect") {
                return Err(CipherError::BackendUnavailable(stderr.trim().to_string()).into());
            }
            return Err(CipherError::DecryptionFailed(format!("gpg decrypt failed: {}", stderr.trim())).into());
        }
        Ok(output.stdout)
    }

    fn recipient_ids(&self, _ctx: &Context, ciphertext: &[u8]) -> Result<Vec<String>> {
        let output = self.run(
            &["--list-only", "--status-fd", "1", "--decrypt"],
            Some(ciphertext),
        )?;
        Ok(parse_enc_to(&String::from_utf8_lossy(&output.stdout)))
    }

    fn list_identities(&self, _ctx: &Context) -> Result<Vec<String>> {
        Ok(self.list_keys(true, None)?.into_iter().map(|(f, _)| f).collect())
    }

    fn list_recipients(&self, _ctx: &Context) -> Result<Vec<String>> {
        Ok(self.list_keys(false, None)?.into_iter().map(|(f, _)| f).collect())
    }

    fn find_recipients(&self, _ctx: &Context, query: &str) -> Result<Vec<String>> {
        Ok(self
            .list_keys(false, Some(query))?
            .into_iter()
            .map(|(f, _)| f)
            .collect())
    }

    fn find_identities(&self, _ctx: &Context, query: &str) -> Result<Vec<String>> {
        Ok(self
            .list_keys(true, Some(query))?
            .into_iter()
            .map(|(f, _)| f)
            .collect())
    }

    fn describe(&self, id: &str) -> String {
        match self.list_keys(false, Some(id)) {
            Ok(keys) => keys
                .into_iter()
                .next()
                .map(|(f, uid)| format!("{} {}", f, uid))
                .unwrap_or_else(|| id.to_string()),
            Err(_) => id.to_string(),
        }
    }

    fn fingerprint(&self, _ctx: &Context, id: &str) -> String {
        self.list_keys(false, Some(id))
            .ok()
            .and_then(|k| k.into_iter().next())
            .map(|(f, _)| f)
            .unwrap_or_else(|| id.to_string())
    }

    fn generate_identity(
        &self,
        _ctx: &Context,
        name: &str,
        email: &str,
        passphrase: &str,
    ) -> Result<String> {
        let mut script = String::from(
            "Key-Type: RSA\nKey-Length: 3072\nSubkey-Type: RSA\nSubkey-Length: 3072\nExpire-Date: 0\n",
        );
        script.push_str(&format!("Name-Real: {}\nName-Email: {}\n", name, email));
        if passphrase.is_empty() {
            script.push_str("%no-protection\n");
        } else {
            script.push_str(&format!("Passphrase: {}\n", passphrase));
        }
        script.push_str("%commit\n");

        let output = self.run(&["--gen-key"], Some(script.as_bytes()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::EncryptionFailed(format!("gpg --gen-key failed: {}", stderr)).into());
        }
        self.list_keys(true, Some(email))?
            .into_iter()
            .next()
            .map(|(f, _)| f)
            .ok_or_else(|| CipherError::EncryptionFailed("generated key not found".into()).into())
    }

    fn import_public_key(&self, _ctx: &Context, key: &[u8]) -> Result<String> {
        let output = self.run(&["--status-fd", "1", "--import"], Some(key))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::InvalidPublicKey(stderr.trim().to_string()).into());
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|l| l.strip_prefix("[GNUPG:] IMPORT_OK "))
            .and_then(|rest| rest.split_whitespace().nth(1))
            .map(str::to_string)
            .ok_or_else(|| CipherError::InvalidPublicKey("no key imported".into()).into())
    }

    fn export_public_key(&self, _ctx: &Context, id: &str) -> Result<Vec<u8>> {
        let output = self.run(&["--armor", "--export", id], None)?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(CipherError::InvalidPublicKey(id.to_string()).into());
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLONS: &str = "\
tru::1:1700000000:0:3:1:5
pub:u:3072:1:AAAA1111BBBB2222:1700000000:::u:::scESC::::::23::0:
fpr:::::::::0123456789ABCDEF0123456789ABCDEF01234567:
uid:u::::1700000000::HASH::Alice <alice@example.org>::::::::::0:
sub:u:3072:1:CCCC3333DDDD4444:1700000000::::::e::::::23:
fpr:::::::::FEDCBA9876543210FEDCBA9876543210FEDCBA98:
pub:r:3072:1:EEEE5555FFFF6666:1600000000:::u:::sc::::::23::0:
fpr:::::::::1111111111111111111111111111111111111111:
uid:r::::1600000000::HASH::Old Key <old@example.org>::::::::::0:
";

    #[test]
    fn test_parse_colons_takes_primary_fingerprint() {
        let keys = parse_colons(COLONS);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].0, "0123456789ABCDEF0123456789ABCDEF01234567");
        assert_eq!(keys[0].1, "Alice <alice@example.org>");
    }

    #[test]
    fn test_parse_colons_empty() {
        assert!(parse_colons("").is_empty());
    }

    #[test]
    fn test_parse_enc_to() {
        let status = "[GNUPG:] ENC_TO 1122334455667788 1 0\n\
                      [GNUPG:] KEY_CONSIDERED ABC 0\n\
                      [GNUPG:] ENC_TO 99AABBCCDDEEFF00 1 0\n";
        assert_eq!(
            parse_enc_to(status),
            vec!["0x1122334455667788", "0x99AABBCCDDEEFF00"]
        );
    }
}
