//! Audit command.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cli::{output, prompt};
use crate::core::audit::{Auditor, ReportFormat};
use crate::core::context::Context;
use crate::core::root::ListOptions;
use crate::error::{Error, Result};

/// Audit flags from the command line.
#[derive(Debug, Default)]
pub struct AuditArgs {
    pub prefix: String,
    pub format: String,
    pub output: Option<PathBuf>,
    pub excludes: Option<PathBuf>,
    pub breach: bool,
    pub jobs: Option<usize>,
}

/// Audit every secret below the prefix and print or write the report.
///
/// # Errors
///
/// Returns `Error::AuditFindings` when any secret has a finding, so the
/// process exits non-zero after the report is out.
pub fn execute(ctx: &Context, args: &AuditArgs) -> Result<()> {
    let format = ReportFormat::from_name(&args.format)?;
    let root = prompt::open_root()?;

    let mut auditor = Auditor::from_config(root.config());
    if let Some(path) = &args.excludes {
        auditor = auditor.with_excludes(&std::fs::read_to_string(path)?)?;
    }
    if args.breach {
        auditor = auditor.with_breach_lookup(root.config());
    }
    if let Some(jobs) = args.jobs {
        auditor = auditor.with_concurrency(jobs);
    }

    let names = root.list(
        ctx,
        &ListOptions {
            prefix: args.prefix.clone(),
            ..ListOptions::default()
        },
    )?;
    info!("Auditing {} secrets", names.len());

    let ctx = if ctx.is_terminal() {
        ctx.with_progress(Arc::new(|done: usize, total: usize| {
            eprint!("\rchecked {}/{}", done, total);
            if done == total {
                eprintln!();
            }
            let _ = std::io::stderr().flush();
        }))
    } else {
        ctx.clone()
    };
    let report = auditor.run(&ctx, &root, &names)?;
    let rendered = report.render(format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            output::success(&format!("report written to {}", output::path(path.display())));
        }
        None => print!("{}", rendered),
    }

    if report.has_findings() {
        return Err(Error::AuditFindings(report.flagged()));
    }
    Ok(())
}
