//! Secret commands.
//!
//! Implements show, insert, rm and link here; generate, listing, transfers
//! and history live in submodules.

mod generate;
mod history;
mod list;
mod transfer;

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::core::secret::Secret;
use crate::error::{Error, Result, StoreError};

pub use generate::{execute as generate, GenerateArgs};
pub use history::execute as history;
pub use list::execute as list;
pub use transfer::{cp, mv};

/// Print a secret, one of its keys, or only its password.
pub fn show(
    ctx: &Context,
    name: &str,
    key: Option<&str>,
    password_only: bool,
    revision: Option<&str>,
) -> Result<()> {
    let root = prompt::open_root()?;

    if revision.is_none() && !root.exists(ctx, name) && root.is_dir(ctx, name) {
        return list(ctx, name, false, false, None);
    }

    let secret = match revision {
        Some(rev) => root.get_revision(ctx, name, rev)?,
        None => root.get(ctx, name)?,
    };

    // plain output for scripting
    if let Some(key) = key {
        let value = secret
            .get(key)
            .ok_or_else(|| StoreError::NotFound(format!("{}:{}", name, key)))?;
        println!("{}", value);
    } else if password_only {
        println!("{}", secret.password());
    } else {
        let body = String::from_utf8_lossy(&secret.bytes()).into_owned();
        print!("{}", body);
        if !body.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

/// Store a secret typed at a prompt or piped on stdin.
pub fn insert(
    ctx: &Context,
    name: &str,
    key: Option<&str>,
    multiline: bool,
    append: bool,
) -> Result<()> {
    info!("Inserting secret: {}", name);
    let root = prompt::open_root()?;
    let exists = root.exists(ctx, name);

    let secret = if let Some(key) = key {
        let mut secret = if exists { root.get(ctx, name)? } else { Secret::new() };
        let value = prompt::read_secret(ctx, &format!("{}:{}", name, key), false)?;
        secret.set(key, value.trim_end())?;
        secret
    } else if append && exists {
        let mut secret = root.get(ctx, name)?;
        let text = prompt::read_secret(ctx, name, true)?;
        secret.append(text.as_bytes())?;
        secret
    } else {
        if exists
            && !ctx.is_force()
            && !prompt::confirm(ctx, &format!("{} already exists. Overwrite?", name))?
        {
            return Err(StoreError::AlreadyExists(name.to_string()).into());
        }
        let input = prompt::read_secret(ctx, name, multiline)?;
        if multiline {
            Secret::parse(input.as_bytes())?
        } else {
            Secret::with_password(input.trim_end_matches(['\r', '\n']))
        }
    };

    root.set(ctx, name, &secret)?;
    output::success(&format!("saved {}", output::name(name)));
    Ok(())
}

/// Remove a secret, or with `recursive` everything under a folder.
pub fn rm(ctx: &Context, name: &str, recursive: bool) -> Result<()> {
    info!("Removing: {} (recursive: {})", name, recursive);
    let root = prompt::open_root()?;

    let question = if recursive {
        format!("Remove {} and everything below it?", name)
    } else {
        format!("Remove {}?", name)
    };
    if !ctx.is_force() && !prompt::confirm(ctx, &question)? {
        return Err(Error::Aborted);
    }

    if recursive {
        root.prune(ctx, name)?;
    } else {
        root.delete(ctx, name)?;
    }
    output::success(&format!("removed {}", output::name(name)));
    Ok(())
}

/// Make `to` resolve to the secret at `from`.
pub fn link(ctx: &Context, from: &str, to: &str) -> Result<()> {
    let root = prompt::open_root()?;
    root.link(ctx, from, to)?;
    output::success(&format!(
        "linked {} to {}",
        output::name(to),
        output::name(from)
    ));
    Ok(())
}
