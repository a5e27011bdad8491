//! Ls command.

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::core::root::ListOptions;
use crate::error::Result;

/// List secrets below `prefix` as a tree, or flat with `flat`/`folders`.
pub fn execute(
    ctx: &Context,
    prefix: &str,
    flat: bool,
    folders: bool,
    depth: Option<usize>,
) -> Result<()> {
    let root = prompt::open_root()?;

    if flat || folders {
        let opts = ListOptions {
            prefix: prefix.to_string(),
            folders,
            depth,
        };
        for name in root.list(ctx, &opts)? {
            println!("{}", name);
        }
        return Ok(());
    }

    let tree = root.tree(ctx, prefix)?;
    if tree.is_empty() {
        output::dimmed("no secrets stored");
        return Ok(());
    }
    let title = if prefix.is_empty() { "gpass" } else { prefix };
    print!("{}", tree.render(title, depth));
    Ok(())
}
