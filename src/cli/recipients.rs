//! Recipient commands.

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::core::leaf::config_alias;
use crate::error::{Error, Result, ValidationError};

/// List recipients of every mount.
pub fn list(ctx: &Context) -> Result<()> {
    let root = prompt::open_root()?;
    for (alias, path) in root.mounts() {
        let store = root.store(alias)?;
        output::section(&format!("{} ({})", config_alias(alias), path.display()));
        let ids = store.list_recipients(ctx)?;
        if ids.is_empty() {
            output::dimmed("no recipients");
        }
        for id in ids {
            let desc = store.cipher().describe(&id);
            if desc == id {
                output::list_item(&id);
            } else {
                output::list_item(&format!("{} ({})", id, desc));
            }
        }
    }
    Ok(())
}

/// Add recipients to one mount. Each addition re-encrypts the mount.
pub fn add(ctx: &Context, store: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(ValidationError::InvalidArgument("no recipients given".into()).into());
    }
    let root = prompt::open_root()?;
    for id in ids {
        info!("Adding recipient {} to {}", id, config_alias(store));
        root.add_recipient(ctx, store, id)?;
        output::success(&format!("added {} to {}", id, config_alias(store)));
    }
    Ok(())
}

/// Remove recipients from one mount. Each removal re-encrypts the mount.
pub fn rm(ctx: &Context, store: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(ValidationError::InvalidArgument("no recipients given".into()).into());
    }
    let root = prompt::open_root()?;
    for id in ids {
        let question = format!("Remove {} from {}?", id, config_alias(store));
        if !prompt::confirm(ctx, &question)? {
            return Err(Error::Aborted);
        }
        root.remove_recipient(ctx, store, id)?;
        output::success(&format!("removed {} from {}", id, config_alias(store)));
    }
    output::hint("removed recipients can still read past revisions");
    Ok(())
}

/// Accept the current recipient files of every mount.
pub fn update(ctx: &Context) -> Result<()> {
    let root = prompt::open_root()?;
    for (store, hash) in root.update_recipients_hash(ctx)? {
        output::success(&format!("{}: {}", store, &hash[..hash.len().min(16)]));
    }
    Ok(())
}
