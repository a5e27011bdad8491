//! Sync command.

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::error::Result;

/// Pull, exchange public keys and push every mount, or only `store`.
pub fn execute(ctx: &Context, store: Option<&str>) -> Result<()> {
    info!(store, no_network = ctx.is_no_network(), "running sync");
    let root = prompt::open_root()?;

    let outcomes = root.sync(ctx, store)?;
    let mut failed = 0;
    for o in &outcomes {
        match &o.error {
            Some(err) => {
                failed += 1;
                output::error(&format!("{}: {}", o.store, err));
            }
            None => output::success(&format!(
                "{}: pulled {}, pushed {}, {} key(s) imported, {} exported",
                o.store,
                yes_no(o.pulled),
                yes_no(o.pushed),
                o.imported,
                o.exported
            )),
        }
    }
    if failed > 0 {
        output::warn(&format!("{} of {} stores failed to sync", failed, outcomes.len()));
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
