//! Template commands.
//!
//! Template names are routed like secret names: `team/websites` is the
//! `websites` template of the `team` mount.

use std::io::{self, Read};

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::core::root::join_alias;
use crate::error::Result;

/// List templates of every mount.
pub fn list(ctx: &Context) -> Result<()> {
    let root = prompt::open_root()?;
    let mut names = Vec::new();
    for (alias, _) in root.mounts() {
        for t in root.store(alias)?.list_templates(ctx)? {
            names.push(join_alias(alias, &t));
        }
    }
    if names.is_empty() {
        output::dimmed("no templates");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn show(ctx: &Context, name: &str) -> Result<()> {
    let root = prompt::open_root()?;
    let (store, rel) = root.route(name)?;
    let body = store.get_template(ctx, &rel)?;
    print!("{}", String::from_utf8_lossy(&body));
    Ok(())
}

/// Create or replace a template with the body read from stdin.
pub fn set(ctx: &Context, name: &str) -> Result<()> {
    let mut body = Vec::new();
    io::stdin().read_to_end(&mut body)?;

    let root = prompt::open_root()?;
    let (store, rel) = root.route(name)?;
    store.set_template(ctx, &rel, &body)?;
    output::success(&format!("saved template {}", output::name(name)));
    Ok(())
}

pub fn rm(ctx: &Context, name: &str) -> Result<()> {
    let root = prompt::open_root()?;
    let (store, rel) = root.route(name)?;
    store.remove_template(ctx, &rel)?;
    output::success(&format!("removed template {}", output::name(name)));
    Ok(())
}
