//! Mount commands.

use std::path::Path;

use crate::cli::{output, prompt};
use crate::core::config;
use crate::core::context::Context;
use crate::core::leaf::config_alias;
use crate::error::Result;

/// List mounts with their crypto and storage backends.
pub fn list(_ctx: &Context) -> Result<()> {
    let root = prompt::open_root()?;
    let mounts = root.mounts();
    if mounts.is_empty() {
        output::dimmed("no stores mounted");
        output::hint("run: gpass init");
        return Ok(());
    }
    for (alias, path) in mounts {
        let store = root.store(alias)?;
        println!(
            "{} => {} ({}, {})",
            output::name(config_alias(alias)),
            output::path(path.display()),
            store.cipher().name(),
            store.storage().name()
        );
    }
    Ok(())
}

/// Mount the store at `path` under `alias`.
pub fn add(ctx: &Context, alias: &str, path: &Path) -> Result<()> {
    let path = config::expand_home(&path.to_string_lossy());
    let mut root = prompt::open_root()?;
    root.mount(ctx, alias, Path::new(&path))?;
    output::success(&format!("mounted {} at {}", output::name(alias), output::path(&path)));
    Ok(())
}

/// Remove the mount `alias`. The store directory is kept.
pub fn rm(_ctx: &Context, alias: &str) -> Result<()> {
    let mut root = prompt::open_root()?;
    root.unmount(alias)?;
    output::success(&format!("unmounted {}", output::name(alias)));
    Ok(())
}
