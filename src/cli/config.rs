//! Config commands.

use crate::cli::output;
use crate::core::config::{Config, Level};
use crate::error::{ConfigError, Result, ValidationError};

/// Print every effective setting with the level that provides it.
pub fn list() -> Result<()> {
    let config = Config::load()?;
    for (key, (value, level)) in config.list() {
        let source = level.map_or_else(|| "default".to_string(), |l| l.to_string());
        println!("{} = {}  {}", key, value, output::faint(&format!("({})", source)));
    }
    Ok(())
}

pub fn get(key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = config
        .get(key)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    println!("{}", value);
    Ok(())
}

/// Write `key` at `level` (system, user, store or worktree).
pub fn set(key: &str, value: &str, level: &str) -> Result<()> {
    let level = Level::from_name(level).ok_or_else(|| {
        ValidationError::InvalidArgument(format!(
            "unknown config level {}, expected system, user, store or worktree",
            level
        ))
    })?;
    let config = Config::load()?;
    config.set(level, key, value)?;
    output::success(&format!("{} = {} ({})", key, value, level));
    Ok(())
}
