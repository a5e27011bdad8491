//! gpass - a git-native password store with pluggable crypto and storage.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # Create stores
//! │   ├── secrets/      # show, insert, generate, ls, rm, mv, cp, link, history
//! │   ├── audit         # Password health report
//! │   ├── recipients    # Recipient management
//! │   ├── mounts        # Sub-store mounts
//! │   ├── templates     # Template CRUD
//! │   ├── sync          # Pull, key exchange, push
//! │   └── config        # Layered configuration
//! └── core/             # Core library components
//!     ├── secret/       # Plaintext formats: KV, AKV, YAML, plain
//!     ├── cipher/       # Crypto backends: age, gpg, plain
//!     ├── storage/      # Blob storage with revision control: fs, gitfs, inmem
//!     ├── leaf/         # One sub-store: a directory, a cipher, a recipient list
//!     ├── root/         # Mount table, routing, cross-mount moves, tree
//!     ├── audit/        # Parallel password audit
//!     ├── template/     # Template evaluation
//!     ├── pwgen/        # Password generator
//!     ├── config/       # Layered git-config style settings
//!     └── context       # Per-call flags and callbacks
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gpass::core::config::Config;
//! use gpass::core::context::Context;
//! use gpass::core::root::RootStore;
//!
//! # fn main() -> gpass::error::Result<()> {
//! let config = Arc::new(Config::load()?);
//! let root = RootStore::open(config)?;
//! let secret = root.get(&Context::new(), "websites/example.com/alice")?;
//! println!("{}", secret.password());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod error;
