//! Command-line interface.

pub mod audit;
pub mod config;
pub mod fsck;
pub mod init;
pub mod mounts;
pub mod output;
pub mod prompt;
pub mod recipients;
pub mod secrets;
pub mod sync;
pub mod templates;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gpass - a git-native password store.
#[derive(Parser)]
#[command(
    name = "gpass",
    about = "A git-native password store with pluggable crypto and storage",
    version
)]
pub struct Cli {
    /// Verbose logging (GPASS_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Never touch the network (no pushes, pulls or breach lookups)
    #[arg(long, global = true, env = "GPASS_NO_NETWORK")]
    pub no_network: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new store (the root store, or a sub-store with --alias)
    Init {
        /// Recipients (key ids or search terms)
        recipients: Vec<String>,
        /// Store directory
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Mount the new store under this alias
        #[arg(short, long)]
        alias: Option<String>,
        /// Crypto backend: age, gpg, plain
        #[arg(long, default_value = "age")]
        crypto: String,
        /// Storage backend: gitfs, fs
        #[arg(long, default_value = "gitfs")]
        storage: String,
    },

    /// Show a secret
    Show {
        name: String,
        /// Print only this key
        key: Option<String>,
        /// Print only the password
        #[arg(short = 'o', long)]
        password: bool,
        /// Read an older revision
        #[arg(short, long)]
        revision: Option<String>,
    },

    /// Insert a secret from a prompt or stdin
    Insert {
        name: String,
        /// Set only this key
        key: Option<String>,
        /// Read the full secret body from stdin
        #[arg(short, long)]
        multiline: bool,
        /// Append to an existing secret
        #[arg(short, long)]
        append: bool,
        /// Overwrite without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a new password
    Generate {
        name: String,
        /// Store the password under this key instead of the first line
        key: Option<String>,
        /// Length in characters (words for xkcd)
        length: Option<usize>,
        /// Include punctuation
        #[arg(short, long)]
        symbols: bool,
        /// Require every character class
        #[arg(long)]
        strict: bool,
        /// Generator: cryptic, memorable, xkcd
        #[arg(short, long, default_value = "cryptic")]
        generator: String,
        /// Word separator for xkcd
        #[arg(long)]
        sep: Option<String>,
        /// Capitalize xkcd words
        #[arg(long)]
        capitalize: bool,
        /// Wordlist language for xkcd
        #[arg(long)]
        lang: Option<String>,
        /// Overwrite without asking
        #[arg(short, long)]
        force: bool,
    },

    /// List secrets
    Ls {
        prefix: Option<String>,
        /// One name per line instead of a tree
        #[arg(short, long)]
        flat: bool,
        /// List folders only
        #[arg(short = 'd', long)]
        folders: bool,
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Remove a secret or, with -r, a folder
    Rm {
        name: String,
        /// Remove a folder recursively
        #[arg(short, long)]
        recursive: bool,
        /// Do not ask
        #[arg(short, long)]
        force: bool,
    },

    /// Move a secret or folder, across mounts if needed
    Mv {
        from: String,
        to: String,
        /// Overwrite existing secrets
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a secret or folder, across mounts if needed
    Cp {
        from: String,
        to: String,
        /// Overwrite existing secrets
        #[arg(short, long)]
        force: bool,
    },

    /// Make one secret an alias of another within a mount
    Link { from: String, to: String },

    /// Show the revisions of a secret
    History {
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit passwords for weak, reused, breached and old entries
    Audit {
        /// Only secrets under this prefix
        prefix: Option<String>,
        /// Report format: text, csv, html, json
        #[arg(long, default_value = "text")]
        format: String,
        /// Write the report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// File with regexes of secret names to skip
        #[arg(long)]
        excludes: Option<PathBuf>,
        /// Check passwords against a breach database (k-anonymity)
        #[arg(long)]
        breach: bool,
        /// Worker count
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Check and repair store integrity
    Fsck {
        prefix: Option<String>,
        /// Re-encrypt secrets whose recipients drifted
        #[arg(long)]
        decrypt: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage recipients
    Recipients {
        #[command(subcommand)]
        action: RecipientsAction,
    },

    /// Manage mounted sub-stores
    Mounts {
        #[command(subcommand)]
        action: MountsAction,
    },

    /// Manage templates
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },

    /// Pull, exchange public keys and push every mount
    Sync {
        /// Only this mount
        #[arg(short, long)]
        store: Option<String>,
    },

    /// Read and write configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Recipient subcommands.
#[derive(Subcommand)]
pub enum RecipientsAction {
    /// List recipients of every mount
    Ls,

    /// Add recipients and re-encrypt
    Add {
        ids: Vec<String>,
        /// Mount alias (root by default)
        #[arg(short, long, default_value = "")]
        store: String,
        /// Add keys the backend does not know
        #[arg(short, long)]
        force: bool,
    },

    /// Remove recipients and re-encrypt
    Rm {
        ids: Vec<String>,
        /// Mount alias (root by default)
        #[arg(short, long, default_value = "")]
        store: String,
    },

    /// Accept the current recipient files after reviewing them
    Update,
}

/// Mount subcommands.
#[derive(Subcommand)]
pub enum MountsAction {
    /// List mounts
    Ls,

    /// Mount an existing store
    Add { alias: String, path: PathBuf },

    /// Unmount a store (its files are kept)
    Rm { alias: String },
}

/// Template subcommands.
#[derive(Subcommand)]
pub enum TemplatesAction {
    /// List templates of every mount
    Ls,

    /// Print a template
    Show { name: String },

    /// Create or replace a template from stdin
    Set { name: String },

    /// Remove a template
    Rm { name: String },
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// List effective settings
    Ls,

    /// Print one setting
    Get { key: String },

    /// Write a setting
    Set {
        key: String,
        value: String,
        /// system, user, store, worktree
        #[arg(long, default_value = "user")]
        level: String,
    },
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns the first error of the command; the caller maps it to an exit
/// code.
pub fn execute(cli: Cli) -> crate::error::Result<()> {
    use Command::*;

    let ctx = prompt::context(&cli);
    match cli.command {
        Init {
            recipients,
            path,
            alias,
            crypto,
            storage,
        } => init::execute(&ctx, &recipients, path, alias.as_deref(), &crypto, &storage),
        Show {
            name,
            key,
            password,
            revision,
        } => secrets::show(&ctx, &name, key.as_deref(), password, revision.as_deref()),
        Insert {
            name,
            key,
            multiline,
            append,
            force,
        } => secrets::insert(&ctx.with_force(force), &name, key.as_deref(), multiline, append),
        Generate {
            name,
            key,
            length,
            symbols,
            strict,
            generator,
            sep,
            capitalize,
            lang,
            force,
        } => secrets::generate(
            &ctx.with_force(force),
            &name,
            key.as_deref(),
            &secrets::GenerateArgs {
                length,
                symbols,
                strict,
                generator,
                sep,
                capitalize,
                lang,
            },
        ),
        Ls {
            prefix,
            flat,
            folders,
            depth,
        } => secrets::list(&ctx, prefix.as_deref().unwrap_or(""), flat, folders, depth),
        Rm {
            name,
            recursive,
            force,
        } => secrets::rm(&ctx.with_force(force), &name, recursive),
        Mv { from, to, force } => secrets::mv(&ctx.with_force(force), &from, &to),
        Cp { from, to, force } => secrets::cp(&ctx.with_force(force), &from, &to),
        Link { from, to } => secrets::link(&ctx, &from, &to),
        History { name, json } => secrets::history(&ctx, &name, json),
        Audit {
            prefix,
            format,
            output,
            excludes,
            breach,
            jobs,
        } => audit::execute(
            &ctx,
            &audit::AuditArgs {
                prefix: prefix.unwrap_or_default(),
                format,
                output,
                excludes,
                breach,
                jobs,
            },
        ),
        Fsck {
            prefix,
            decrypt,
            json,
        } => fsck::execute(
            &ctx.with_fsck_decrypt(decrypt),
            prefix.as_deref().unwrap_or(""),
            json,
        ),
        Recipients { action } => match action {
            RecipientsAction::Ls => recipients::list(&ctx),
            RecipientsAction::Add { ids, store, force } => {
                recipients::add(&ctx.with_force(force), &store, &ids)
            }
            RecipientsAction::Rm { ids, store } => recipients::rm(&ctx, &store, &ids),
            RecipientsAction::Update => recipients::update(&ctx),
        },
        Mounts { action } => match action {
            MountsAction::Ls => mounts::list(&ctx),
            MountsAction::Add { alias, path } => mounts::add(&ctx, &alias, &path),
            MountsAction::Rm { alias } => mounts::rm(&ctx, &alias),
        },
        Templates { action } => match action {
            TemplatesAction::Ls => templates::list(&ctx),
            TemplatesAction::Show { name } => templates::show(&ctx, &name),
            TemplatesAction::Set { name } => templates::set(&ctx, &name),
            TemplatesAction::Rm { name } => templates::rm(&ctx, &name),
        },
        Sync { store } => sync::execute(&ctx, store.as_deref()),
        Config { action } => match action {
            ConfigAction::Ls => config::list(),
            ConfigAction::Get { key } => config::get(&key),
            ConfigAction::Set { key, value, level } => config::set(&key, &value, &level),
        },
    }
}
