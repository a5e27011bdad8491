//! Mv and cp commands.

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::error::Result;

/// Move a secret or folder. Works across mounts.
pub fn mv(ctx: &Context, from: &str, to: &str) -> Result<()> {
    info!("Moving {} to {}", from, to);
    let root = prompt::open_root()?;
    let n = root.rename(ctx, from, to)?;
    report("moved", n, from, to);
    Ok(())
}

/// Copy a secret or folder. Works across mounts.
pub fn cp(ctx: &Context, from: &str, to: &str) -> Result<()> {
    info!("Copying {} to {}", from, to);
    let root = prompt::open_root()?;
    let n = root.copy(ctx, from, to)?;
    report("copied", n, from, to);
    Ok(())
}

fn report(verb: &str, n: usize, from: &str, to: &str) {
    match n {
        0 => output::dimmed(&format!("nothing to do, {} matched no secrets", from)),
        1 => output::success(&format!(
            "{} {} to {}",
            verb,
            output::name(from),
            output::name(to)
        )),
        n => output::success(&format!(
            "{} {} secrets from {} to {}",
            verb,
            n,
            output::name(from),
            output::name(to)
        )),
    }
}
