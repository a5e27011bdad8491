//! Password generation.
//!
//! Three styles: random characters ([`Cryptic`]), pronounceable syllables
//! ([`memorable`]) and word passphrases ([`Xkcd`]). Random passwords for a
//! secret whose path names a domain with a known rule are clamped to it.

mod cryptic;
pub mod memorable;
mod rules;
mod xkcd;

use tracing::debug;

use crate::core::config::Config;
use crate::core::constants::{DEFAULT_PW_LENGTH, PW_LENGTH_ENV};
use crate::error::{Result, ValidationError};

pub use cryptic::Cryptic;
pub use rules::{domain_of, Rule, Rules};
pub use xkcd::Xkcd;

pub(crate) const DIGITS: &str = "0123456789";
pub(crate) const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub(crate) const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
pub(crate) const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Cryptic,
    Memorable,
    Xkcd,
}

impl Style {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "cryptic" | "random" => Ok(Style::Cryptic),
            "memorable" => Ok(Style::Memorable),
            "xkcd" => Ok(Style::Xkcd),
            other => Err(ValidationError::InvalidArgument(format!(
                "unknown generator {}, expected cryptic, memorable or xkcd",
                other
            ))
            .into()),
        }
    }
}

/// Generator settings. `length` counts characters, or words for
/// [`Style::Xkcd`].
#[derive(Debug, Clone)]
pub struct Options {
    pub style: Style,
    pub length: usize,
    pub symbols: bool,
    pub strict: bool,
    pub separator: String,
    pub capitalize: bool,
    pub lang: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            style: Style::Cryptic,
            length: DEFAULT_PW_LENGTH,
            symbols: false,
            strict: false,
            separator: " ".to_string(),
            capitalize: false,
            lang: "en".to_string(),
        }
    }
}

impl Options {
    /// Defaults from `generate.*` and `pwgen.*` config keys.
    pub fn from_config(config: &Config) -> Self {
        Self {
            symbols: config.get_bool("generate.symbols"),
            strict: config.get_bool("generate.strict"),
            lang: config.get("pwgen.xkcd-lang").unwrap_or_else(|| "en".to_string()),
            ..Self::default()
        }
    }
}

/// Password length from, in order: the command line, `GPASS_PW_DEFAULT_LENGTH`,
/// `generate.length`, then the built-in default.
///
/// # Errors
///
/// Returns `ValidationError::InvalidLength` for an explicit length of zero.
pub fn resolve_length(cli: Option<usize>, config: &Config) -> Result<usize> {
    let env = std::env::var(PW_LENGTH_ENV).ok();
    resolve_length_from(cli, env.as_deref(), config)
}

fn resolve_length_from(cli: Option<usize>, env: Option<&str>, config: &Config) -> Result<usize> {
    if let Some(n) = cli {
        if n == 0 {
            return Err(ValidationError::InvalidLength("length must be at least 1".into()).into());
        }
        return Ok(n);
    }
    // invalid values fall through silently
    if let Some(n) = env.and_then(|v| v.trim().parse::<usize>().ok()).filter(|n| *n > 0) {
        return Ok(n);
    }
    if let Some(n) = config.get_int("generate.length").filter(|n| *n > 0) {
        return Ok(n as usize);
    }
    Ok(DEFAULT_PW_LENGTH)
}

/// Generate a password for the secret `name` with the built-in site rules.
pub fn generate(name: &str, opts: &Options) -> Result<String> {
    generate_with(&Rules::builtin()?, name, opts)
}

/// Generate a password for the secret `name`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidLength` for a zero length,
/// `ValidationError::UnknownLanguage` for a missing wordlist and
/// `ValidationError::GenerationFailed` when the constraints cannot be met.
pub fn generate_with(rules: &Rules, name: &str, opts: &Options) -> Result<String> {
    if opts.length == 0 {
        return Err(ValidationError::InvalidLength("length must be at least 1".into()).into());
    }

    match opts.style {
        Style::Memorable => Ok(memorable::password(opts.length, opts.symbols, opts.strict)),
        Style::Xkcd => Xkcd {
            words: opts.length,
            separator: opts.separator.clone(),
            capitalize: opts.capitalize,
            lang: opts.lang.clone(),
        }
        .password(),
        Style::Cryptic => {
            let rule = domain_of(name).and_then(|d| rules.lookup(d).map(|r| (d, r)));
            let generator = match rule {
                Some((domain, rule)) => {
                    debug!(domain, "using password rule");
                    Cryptic::for_rule(opts.length, opts.symbols, rule)
                }
                None if opts.strict => Cryptic::new(opts.length, opts.symbols).strict(),
                None => Cryptic::new(opts.length, opts.symbols),
            };
            generator
                .password()
                .ok_or_else(|| ValidationError::GenerationFailed(name.to_string()).into())
        }
    }
}
