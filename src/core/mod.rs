//! Core library components.
//!
//! Secret parsing, crypto and storage backends, sub-stores and the mount
//! table, plus the audit, template and generator engines built on top.

pub mod audit;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod context;
pub mod leaf;
pub mod pwgen;
pub mod recipients;
pub mod root;
pub mod secret;
pub mod storage;
pub mod template;
pub mod types;
