//! Fsck command.

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::error::{Result, ValidationError};

/// Check every mount, or the one `prefix` routes to, and print a summary.
pub fn execute(ctx: &Context, prefix: &str, json: bool) -> Result<()> {
    info!("Checking store integrity (decrypt: {})", ctx.is_fsck_decrypt());
    let root = prompt::open_root()?;
    let reports = root.fsck(ctx, prefix)?;

    if json {
        let out = serde_json::to_string_pretty(&reports)
            .map_err(|e| ValidationError::InvalidArgument(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    for report in &reports {
        output::section(&report.store);
        output::kv("checked:", report.checked);
        for (name, err) in &report.errors {
            output::error(&format!("{}: {}", name, err));
        }
        for name in &report.drift {
            output::warn(&format!("{}: recipients differ from the store", name));
        }
        for name in &report.unstable {
            output::warn(&format!("{}: does not survive a parse round trip", name));
        }
        for name in &report.repaired {
            output::success(&format!("re-encrypted {}", name));
        }
        if report.is_clean() {
            output::success("clean");
        } else if !report.drift.is_empty() && !ctx.is_fsck_decrypt() {
            output::hint("run: gpass fsck --decrypt to re-encrypt drifted secrets");
        }
    }
    Ok(())
}
