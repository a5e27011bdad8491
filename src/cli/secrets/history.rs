//! History command.

use crate::cli::{output, prompt};
use crate::core::context::Context;
use crate::error::{Result, ValidationError};

/// Print the revisions of a secret, newest first.
pub fn execute(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let root = prompt::open_root()?;
    let revisions = root.revisions(ctx, name)?;

    if json {
        let out = serde_json::to_string_pretty(&revisions)
            .map_err(|e| ValidationError::InvalidArgument(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if revisions.is_empty() {
        output::dimmed("no history");
        return Ok(());
    }
    for rev in &revisions {
        let short = rev.hash.get(..8).unwrap_or(&rev.hash);
        println!(
            "{} - {} <{}> - {} - {}",
            short,
            rev.author_name,
            rev.author_email,
            rev.date.format("%Y-%m-%d %H:%M:%S"),
            rev.subject
        );
    }
    Ok(())
}
