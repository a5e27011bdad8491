//! Constants used throughout gpass.
//!
//! Centralizes magic strings and configuration values.

/// Application directory name under the platform config dir.
pub const APP_DIR: &str = "gpass";

/// System-wide config file.
pub const SYSTEM_CONFIG: &str = "/etc/gpass/config";

/// Env var overriding the user config directory.
pub const CONFIG_DIR_ENV: &str = "GPASS_CONFIG_DIR";

/// Store-level config file, relative to the root store.
pub const STORE_CONFIG_FILE: &str = ".gpass-config";

/// Worktree-level config file, relative to the root store. Never committed.
pub const WORKTREE_CONFIG_FILE: &str = ".gpass-config.local";

/// Template directory inside a sub-store.
pub const TEMPLATE_DIR: &str = ".gpass-templates";

/// Exported public keys inside a sub-store.
pub const PUBLIC_KEY_DIR: &str = ".public-keys";

/// Config key prefix for recipient hashes.
pub const RECIPIENTS_HASH_KEY: &str = "recipients.hash";

/// Config alias used for the root mount in per-mount keys.
pub const ROOT_ALIAS: &str = "root";

/// Env var overriding the generated password length.
pub const PW_LENGTH_ENV: &str = "GPASS_PW_DEFAULT_LENGTH";

/// Password length when nothing else is configured.
pub const DEFAULT_PW_LENGTH: usize = 24;

/// Default remote and branch for sync.
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";

/// Config key for the recipient hash of `alias`.
pub fn recipients_hash_key(alias: &str) -> String {
    let alias = if alias.is_empty() { ROOT_ALIAS } else { alias };
    format!("{}.{}", RECIPIENTS_HASH_KEY, alias)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_hash_key() {
        assert_eq!(recipients_hash_key(""), "recipients.hash.root");
        assert_eq!(recipients_hash_key("team"), "recipients.hash.team");
    }
}
