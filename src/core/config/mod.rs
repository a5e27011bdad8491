//! Layered configuration.
//!
//! Five layers, most specific first: env, worktree, store, user, system.
//! Reads return the first layer that defines a key, then the known-key
//! default. Writes always name a level explicitly.
//!
//! ## Files
//!
//! - system: `/etc/gpass/config`
//! - user: `$GPASS_CONFIG_DIR/config` or `<config dir>/gpass/config`
//! - store: `<root store>/.gpass-config`
//! - worktree: `<root store>/.gpass-config.local`
//! - env: `GPASS_CONFIG_COUNT`, `GPASS_CONFIG_KEY_<n>`, `GPASS_CONFIG_VALUE_<n>`

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result, StorageError};

mod gitconfig;
pub mod keys;

pub use gitconfig::GitConfig;
pub use keys::{KeyType, KnownKey, KNOWN_KEYS};

/// Configuration layer, ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    System,
    User,
    Store,
    Worktree,
    Env,
}

impl Level {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Level::System),
            "user" | "global" => Some(Level::User),
            "store" | "local" => Some(Level::Store),
            "worktree" => Some(Level::Worktree),
            "env" => Some(Level::Env),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::System => "system",
            Level::User => "user",
            Level::Store => "store",
            Level::Worktree => "worktree",
            Level::Env => "env",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Layer {
    level: Level,
    path: Option<PathBuf>,
    file: GitConfig,
}

/// Merged view over all layers. Shared between stores via `Arc<Config>`.
#[derive(Debug, Default)]
pub struct Config {
    layers: RwLock<Vec<Layer>>,
}

impl Config {
    /// Load system, user, and env layers, then the store layers of the
    /// configured root mount if any.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if a file exists but is malformed.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(PathBuf::from(constants::SYSTEM_CONFIG)), user_config_path())
    }

    /// Load with explicit system and user file locations.
    pub fn load_from(system: Option<PathBuf>, user: Option<PathBuf>) -> Result<Self> {
        let cfg = Self::default();
        {
            let mut layers = cfg.layers.write();
            if let Some(path) = system {
                layers.push(read_layer(Level::System, path)?);
            }
            match user {
                Some(path) => layers.push(read_layer(Level::User, path)?),
                None => layers.push(memory_layer(Level::User)),
            }
            layers.push(env_layer());
        }
        if let Some(root) = cfg.get_raw("mounts.path") {
            cfg.set_store_root(Path::new(&expand_home(&root)))?;
        }
        Ok(cfg)
    }

    /// Config without any files. Writes to the user level stay in memory.
    pub fn in_memory() -> Self {
        let cfg = Self::default();
        cfg.layers.write().push(memory_layer(Level::User));
        cfg
    }

    /// (Re)load the store and worktree layers from `root`.
    pub fn set_store_root(&self, root: &Path) -> Result<()> {
        let store = read_layer(Level::Store, root.join(constants::STORE_CONFIG_FILE))?;
        let worktree = read_layer(Level::Worktree, root.join(constants::WORKTREE_CONFIG_FILE))?;
        let mut layers = self.layers.write();
        layers.retain(|l| l.level != Level::Store && l.level != Level::Worktree);
        layers.push(store);
        layers.push(worktree);
        layers.sort_by_key(|l| l.level);
        debug!(root = %root.display(), "loaded store config layers");
        Ok(())
    }

    /// Value from the most specific layer, without defaults.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let layers = self.layers.read();
        layers
            .iter()
            .rev()
            .find_map(|l| l.file.get(key).map(str::to_string))
    }

    /// Value from the most specific layer, or the known-key default.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_raw(key)
            .or_else(|| keys::lookup(key).and_then(|k| k.default).map(str::to_string))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .and_then(|v| keys::parse_bool(&v))
            .unwrap_or(false)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Level that currently provides `key`.
    pub fn level_of(&self, key: &str) -> Option<Level> {
        let layers = self.layers.read();
        layers
            .iter()
            .rev()
            .find(|l| l.file.get(key).is_some())
            .map(|l| l.level)
    }

    /// Write `key` at `level` and persist the layer file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKey`/`InvalidValue` for bad input,
    /// `ConfigError::ReadOnly` for the env layer, and `ConfigError::NoFile`
    /// when the level has not been loaded.
    pub fn set(&self, level: Level, key: &str, value: &str) -> Result<()> {
        keys::validate(key, value)?;
        self.write_layer(level, |file| file.set(key, value))?;
        debug!(%level, key, "config set");
        Ok(())
    }

    /// Remove `key` from `level`.
    pub fn unset(&self, level: Level, key: &str) -> Result<()> {
        self.write_layer(level, |file| {
            file.unset(key);
            Ok(())
        })
    }

    fn write_layer(&self, level: Level, f: impl FnOnce(&mut GitConfig) -> Result<()>) -> Result<()> {
        if level == Level::Env {
            return Err(ConfigError::ReadOnly(level.to_string()).into());
        }
        let mut layers = self.layers.write();
        let layer = layers
            .iter_mut()
            .find(|l| l.level == level)
            .ok_or_else(|| ConfigError::NoFile(level.to_string()))?;
        f(&mut layer.file)?;
        if let Some(path) = &layer.path {
            write_atomic(path, &layer.file.serialize())?;
        }
        Ok(())
    }

    /// Merged key/value view with the providing level.
    pub fn list(&self) -> BTreeMap<String, (String, Option<Level>)> {
        let mut out = BTreeMap::new();
        for k in KNOWN_KEYS {
            if let (false, Some(d)) = (k.key.contains('*'), k.default) {
                out.insert(k.key.to_string(), (d.to_string(), None));
            }
        }
        let layers = self.layers.read();
        for layer in layers.iter() {
            for (k, v) in layer.file.entries() {
                out.insert(k.to_string(), (v.to_string(), Some(layer.level)));
            }
        }
        out
    }

    /// Sub-mounts declared as `mounts.<alias>.path`.
    pub fn mounts(&self) -> BTreeMap<String, PathBuf> {
        let mut out = BTreeMap::new();
        for (key, (value, _)) in self.list() {
            if let Some(alias) = key
                .strip_prefix("mounts.")
                .and_then(|rest| rest.strip_suffix(".path"))
            {
                if !alias.is_empty() {
                    out.insert(alias.to_string(), PathBuf::from(expand_home(&value)));
                }
            }
        }
        out
    }

    /// Path of the file behind `level`, if any.
    pub fn path_of(&self, level: Level) -> Option<PathBuf> {
        let layers = self.layers.read();
        layers
            .iter()
            .find(|l| l.level == level)
            .and_then(|l| l.path.clone())
    }
}

/// Default user config path.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(constants::CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join("config"));
    }
    dirs::config_dir().map(|d| d.join(constants::APP_DIR).join("config"))
}

/// Expand a leading `~/`.
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

fn memory_layer(level: Level) -> Layer {
    Layer {
        level,
        path: None,
        file: GitConfig::new(),
    }
}

fn read_layer(level: Level, path: PathBuf) -> Result<Layer> {
    let file = match fs::read_to_string(&path) {
        Ok(text) => GitConfig::parse(&text, &path.display().to_string())?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => GitConfig::new(),
        Err(source) => return Err(StorageError::ReadFailed { path, source }.into()),
    };
    Ok(Layer {
        level,
        path: Some(path),
        file,
    })
}

fn env_layer() -> Layer {
    let mut file = GitConfig::new();
    let count = std::env::var("GPASS_CONFIG_COUNT")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0);
    for i in 0..count {
        let key = std::env::var(format!("GPASS_CONFIG_KEY_{}", i));
        let value = std::env::var(format!("GPASS_CONFIG_VALUE_{}", i));
        if let (Ok(key), Ok(value)) = (key, value) {
            if file.set(&key, &value).is_err() {
                debug!(key, "ignoring malformed env config key");
            }
        }
    }
    memory_layer_with(Level::Env, file)
}

fn memory_layer_with(level: Level, file: GitConfig) -> Layer {
    Layer {
        level,
        path: None,
        file,
    }
}

/// Write through a temp file in the same directory, then rename.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let write_err = |source| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
