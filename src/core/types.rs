//! Shared domain types and aliases.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One commit touching a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub body: String,
}
