//! Init command.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cli::output;
use crate::core::cipher::CipherKind;
use crate::core::config::{self, Config};
use crate::core::constants::{APP_DIR, ROOT_ALIAS};
use crate::core::context::Context;
use crate::core::root::RootStore;
use crate::core::storage::StorageKind;
use crate::error::{Result, StoreError, ValidationError};

/// Create a store and mount it. Without `alias` this is the root store.
pub fn execute(
    ctx: &Context,
    recipients: &[String],
    path: Option<PathBuf>,
    alias: Option<&str>,
    crypto: &str,
    storage: &str,
) -> Result<()> {
    let crypto = CipherKind::from_name(crypto)?;
    let storage = StorageKind::from_name(storage)?;
    let alias = alias.unwrap_or("");

    let config = Arc::new(Config::load()?);
    let mut root = RootStore::open(config.clone())?;
    if alias.is_empty() && root.has_root() {
        let existing = root.store("")?.path().to_path_buf();
        return Err(StoreError::AlreadyInitialized(existing).into());
    }

    let path = match path {
        Some(p) => PathBuf::from(config::expand_home(&p.to_string_lossy())),
        None => default_path(alias)?,
    };

    let recipients = if recipients.is_empty() {
        default_recipients(ctx, crypto, &config)?
    } else {
        recipients.to_vec()
    };

    info!(alias, path = %path.display(), crypto = crypto.name(), "initializing store");
    root.init(ctx, alias, &path, &recipients, crypto, storage)?;

    let label = if alias.is_empty() { "root store" } else { alias };
    output::success(&format!("initialized {} at {}", label, output::path(path.display())));
    output::kv("crypto:", crypto.name());
    output::kv("storage:", storage.name());
    output::kv("recipients:", recipients.join(", "));
    println!();
    println!("Next: {} to add a secret", output::cmd("gpass insert <name>"));
    Ok(())
}

/// `~/.local/share/gpass/stores/<alias>`, or `.../stores/root`.
fn default_path(alias: &str) -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| ValidationError::InvalidArgument("no data directory, pass --path".into()))?;
    let leaf = if alias.is_empty() { ROOT_ALIAS } else { alias };
    Ok(base.join(APP_DIR).join("stores").join(leaf))
}

/// Local identities of the backend; a fresh one is created when there are
/// none.
fn default_recipients(ctx: &Context, crypto: CipherKind, config: &Config) -> Result<Vec<String>> {
    let cipher = crypto.build(config)?;
    let ids = cipher.list_identities(ctx)?;
    if !ids.is_empty() {
        return Ok(ids);
    }
    let name = ctx
        .username()
        .map(str::to_string)
        .unwrap_or_else(whoami::username);
    let email = ctx.email().unwrap_or_default().to_string();
    let id = cipher.generate_identity(ctx, &name, &email, "")?;
    output::success(&format!("generated a new {} identity {}", crypto.name(), id));
    Ok(vec![id])
}
