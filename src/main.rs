//! gpass - a git-native password store.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gpass::cli::output;
use gpass::cli::{execute, Cli};
use gpass::error::{Error, ErrorKind};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("GPASS_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("gpass=debug")
        } else {
            EnvFilter::new("gpass=warn")
        }
    });

    // stdout carries secrets and reports, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .init();
    }

    if let Err(e) = execute(cli) {
        // audit findings already printed their report
        if !matches!(e, Error::AuditFindings(_)) {
            output::error(&e.to_string());
            if let Some(hint) = hint(&e) {
                output::hint(hint);
            }
        }
        std::process::exit(e.exit_code());
    }
}

fn hint(e: &Error) -> Option<&'static str> {
    match e.kind() {
        ErrorKind::NotInitialized => Some("run: gpass init"),
        ErrorKind::NoMount => Some("run: gpass mounts ls, or gpass init to create a store"),
        ErrorKind::CrossMount => Some("links cannot span mounts, use gpass cp"),
        ErrorKind::RecipientUnknown => Some("run: gpass recipients ls"),
        ErrorKind::RcsNoRemote => Some("add a remote with git in the store directory"),
        _ => None,
    }
}
