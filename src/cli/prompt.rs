//! Terminal interaction: the per-invocation context and prompts.

use std::io::{self, Read};
use std::sync::Arc;

use dialoguer::{Confirm, Password};

use crate::cli::Cli;
use crate::core::config::Config;
use crate::core::context::Context;
use crate::core::root::RootStore;
use crate::error::{Error, Result};

fn prompt_error(e: dialoguer::Error) -> Error {
    match e {
        dialoguer::Error::IO(io) => Error::Io(io),
    }
}

/// Context for one CLI invocation, built from the global flags.
pub fn context(cli: &Cli) -> Context {
    let terminal = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
    let ctx = Context::new()
        .with_terminal(terminal)
        .with_interactive(terminal && !cli.yes)
        .with_always_yes(cli.yes)
        .with_no_network(cli.no_network);

    if !terminal {
        return ctx;
    }
    ctx.with_password_prompt(Arc::new(|prompt: &str| {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(prompt_error)
    }))
    .with_import_callback(Arc::new(|key: &str| {
        Confirm::new()
            .with_prompt(format!("Import public key {}?", key))
            .default(false)
            .interact()
            .unwrap_or(false)
    }))
}

/// Load config and open every configured mount.
pub fn open_root() -> Result<RootStore> {
    let config = Arc::new(Config::load()?);
    RootStore::open(config)
}

/// Ask a yes/no question. `--yes` answers yes; non-interactive runs answer
/// no.
pub fn confirm(ctx: &Context, question: &str) -> Result<bool> {
    if ctx.is_always_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()
        .map_err(prompt_error)
}

/// Read a secret value: hidden prompt with confirmation on a terminal,
/// otherwise all of stdin.
pub fn read_secret(ctx: &Context, name: &str, multiline: bool) -> Result<String> {
    if !atty::is(atty::Stream::Stdin) || !ctx.is_interactive() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        if !multiline {
            input = input.lines().next().unwrap_or_default().to_string();
        }
        return Ok(input);
    }
    Password::new()
        .with_prompt(format!("Password for {}", name))
        .with_confirmation("Retype password", "passwords do not match")
        .interact()
        .map_err(prompt_error)
}
