//! Generate command.

use tracing::info;
use zeroize::Zeroizing;

use crate::cli::{output, prompt};
use crate::core::config::Config;
use crate::core::context::Context;
use crate::core::pwgen::{self, Options, Style, Xkcd};
use crate::core::secret::Secret;
use crate::core::template;
use crate::error::{Result, StoreError, ValidationError};

/// Generator flags from the command line.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub length: Option<usize>,
    pub symbols: bool,
    pub strict: bool,
    pub generator: String,
    pub sep: Option<String>,
    pub capitalize: bool,
    pub lang: Option<String>,
}

/// Generate a password and store it at `name`, or under `key` of the
/// existing secret.
///
/// A new secret goes through the template matching its path, if any. An
/// existing secret keeps its body and only gets the new password.
pub fn execute(ctx: &Context, name: &str, key: Option<&str>, args: &GenerateArgs) -> Result<()> {
    let root = prompt::open_root()?;

    // `gpass generate NAME 16` puts the length where the key goes
    let (key, length) = match key {
        Some(k) if args.length.is_none() && k.parse::<usize>().is_ok() => (None, k.parse().ok()),
        k => (k, args.length),
    };

    let opts = options(root.config(), args, length)?;
    info!(secret = name, style = ?opts.style, length = opts.length, "generating password");
    let password = Zeroizing::new(pwgen::generate(name, &opts)?);

    let exists = root.exists(ctx, name);
    let secret = if let Some(key) = key {
        let mut secret = if exists { root.get(ctx, name)? } else { Secret::new() };
        secret.set(key, &password)?;
        secret
    } else if exists {
        if !ctx.is_force()
            && !prompt::confirm(ctx, &format!("{} already exists. Replace its password?", name))?
        {
            return Err(StoreError::AlreadyExists(name.to_string()).into());
        }
        let mut secret = root.get(ctx, name)?;
        secret.set_password(&password);
        secret
    } else {
        match template::apply(ctx, &root, name, &password)? {
            Some(body) => Secret::parse(body.as_bytes())?,
            None => Secret::with_password(&password),
        }
    };

    root.set(ctx, name, &secret)?;
    output::success(&format!("generated password for {}", output::name(name)));
    if !ctx.is_hidden() {
        println!("{}", password.as_str());
    }
    Ok(())
}

fn options(config: &Config, args: &GenerateArgs, length: Option<usize>) -> Result<Options> {
    let mut opts = Options::from_config(config);
    opts.style = Style::from_name(&args.generator)?;
    opts.symbols |= args.symbols;
    opts.strict |= args.strict;
    opts.capitalize = args.capitalize;
    if let Some(sep) = &args.sep {
        opts.separator = sep.clone();
    }
    if let Some(lang) = &args.lang {
        opts.lang = lang.clone();
    }
    opts.length = match (opts.style, length) {
        (Style::Xkcd, Some(0)) => {
            return Err(ValidationError::InvalidLength("length must be at least 1".into()).into())
        }
        (Style::Xkcd, Some(words)) => words,
        (Style::Xkcd, None) => Xkcd::default().words,
        (_, length) => pwgen::resolve_length(length, config)?,
    };
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(generator: &str) -> GenerateArgs {
        GenerateArgs {
            generator: generator.into(),
            ..GenerateArgs::default()
        }
    }

    #[test]
    fn test_xkcd_counts_words() {
        let cfg = Config::in_memory();
        assert_eq!(options(&cfg, &args("xkcd"), None).unwrap().length, 4);
        assert_eq!(options(&cfg, &args("xkcd"), Some(6)).unwrap().length, 6);
        assert!(options(&cfg, &args("xkcd"), Some(0)).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cfg = Config::in_memory();
        let mut a = args("cryptic");
        a.symbols = true;
        a.lang = Some("de".into());
        let opts = options(&cfg, &a, Some(10)).unwrap();
        assert!(opts.symbols);
        assert_eq!(opts.lang, "de");
        assert_eq!(opts.length, 10);
        assert!(options(&cfg, &args("bogus"), None).is_err());
    }
}
