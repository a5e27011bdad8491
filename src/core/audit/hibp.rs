//! Breach lookup over a k-anonymity range API.
//!
//! Only the first five hex digits of the SHA-1 of a password leave the
//! machine. The endpoint answers with every known suffix for that prefix as
//! `SUFFIX:COUNT` lines.

use sha1::{Digest, Sha1};
use tracing::debug;

use super::report::Finding;
use super::validators::Validator;
use crate::core::context::Context;
use crate::core::secret::Secret;
use crate::error::{Error, Result};

/// Source of range responses.
pub trait RangeLookup: Send + Sync {
    /// Body listing `SUFFIX:COUNT` lines for a five character prefix.
    fn range(&self, ctx: &Context, prefix: &str) -> Result<String>;
}

/// [`RangeLookup`] over HTTP. Uses the context's client when one is set.
#[derive(Debug, Clone)]
pub struct HttpRange {
    endpoint: String,
}

impl HttpRange {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl RangeLookup for HttpRange {
    fn range(&self, ctx: &Context, prefix: &str) -> Result<String> {
        let url = format!("{}{}", self.endpoint, prefix);
        let fallback;
        let client = match ctx.http_client() {
            Some(c) => c,
            None => {
                fallback = reqwest::blocking::Client::builder()
                    .user_agent(concat!("gpass/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(io_error)?;
                &fallback
            }
        };
        let response = client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(io_error)?;
        response.text().map_err(io_error)
    }
}

fn io_error(e: reqwest::Error) -> Error {
    Error::Io(std::io::Error::other(e))
}

/// Warns when a password appears in the breach corpus.
pub struct Breach {
    lookup: Box<dyn RangeLookup>,
}

impl Breach {
    pub fn new(lookup: Box<dyn RangeLookup>) -> Self {
        Self { lookup }
    }
}

impl Validator for Breach {
    fn name(&self) -> &'static str {
        "breach"
    }

    fn check(&self, ctx: &Context, name: &str, secret: &Secret) -> Option<Finding> {
        if ctx.is_no_network() {
            return None;
        }
        let hash: String = Sha1::digest(secret.password().as_bytes())
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect();
        let (prefix, suffix) = hash.split_at(5);
        let body = match self.lookup.range(ctx, prefix) {
            Ok(b) => b,
            Err(e) => {
                debug!(secret = name, "breach lookup failed: {}", e);
                return None;
            }
        };
        let count = breach_count(&body, suffix)?;
        Some(Finding::warning(format!(
            "password appears in {} known breaches",
            count
        )))
    }
}

/// Count for `suffix` in a range response body.
fn breach_count(body: &str, suffix: &str) -> Option<u64> {
    body.lines().find_map(|line| {
        let (s, count) = line.trim().split_once(':')?;
        s.eq_ignore_ascii_case(suffix)
            .then(|| count.trim().parse().unwrap_or(1))
    })
}
