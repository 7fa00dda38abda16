//! Layered configuration for boot
//!
//! Every setting lives in a flat `BOOT_*` key space assembled from, lowest
//! precedence first:
//!
//! 1. `<BOOT_HOME>/cache/boot.toml` (legacy location)
//! 2. `<BOOT_HOME>/boot.toml`
//! 3. `<project>/boot.toml`, where project is the nearest `.git` ancestor
//! 4. `<cwd>/boot.toml`
//! 5. process environment
//! 6. explicit overrides
//!
//! Keys without the `BOOT_` prefix are dropped after merging.

pub mod properties;
pub mod settings;

pub use properties::Properties;
pub use settings::{Channel, Settings};

use crate::error::{BootError, BootResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of every layered properties file
pub const PROPERTIES_FILE: &str = "boot.toml";

/// Prefix every surviving key must carry
pub const KEY_PREFIX: &str = "BOOT_";

/// Configuration key names
pub mod keys {
    pub const HOME: &str = "BOOT_HOME";
    pub const VERSION: &str = "BOOT_VERSION";
    pub const LOCAL_REPO: &str = "BOOT_LOCAL_REPO";
    pub const CLOJURE_NAME: &str = "BOOT_CLOJURE_NAME";
    pub const CLOJURE_VERSION: &str = "BOOT_CLOJURE_VERSION";
    pub const CHANNEL: &str = "BOOT_CHANNEL";
    pub const AS_ROOT: &str = "BOOT_AS_ROOT";
    pub const POD_LAUNCHER: &str = "BOOT_POD_LAUNCHER";
    pub const LOG: &str = "BOOT_LOG";
}

/// Raw inputs the key space is assembled from
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// The user's home directory
    pub user_home: Option<PathBuf>,

    /// Directory the tool was started in
    pub work_dir: PathBuf,

    /// Process environment
    pub env: BTreeMap<String, String>,

    /// Highest-precedence values, set programmatically
    pub overrides: BTreeMap<String, String>,
}

impl ConfigSources {
    /// Capture sources from the running process
    pub fn from_process() -> BootResult<Self> {
        let work_dir = std::env::current_dir()
            .map_err(|e| BootError::io("getting current directory", e))?;
        Ok(Self {
            user_home: dirs::home_dir(),
            work_dir,
            env: std::env::vars().collect(),
            overrides: BTreeMap::new(),
        })
    }

    /// Add an override that beats every other source
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Installation root: override, then environment, then `~/.boot`
    pub fn boot_home(&self) -> BootResult<PathBuf> {
        if let Some(home) = self
            .overrides
            .get(keys::HOME)
            .or_else(|| self.env.get(keys::HOME))
        {
            return Ok(PathBuf::from(home));
        }
        self.user_home
            .as_ref()
            .map(|h| h.join(".boot"))
            .ok_or(BootError::HomeNotFound)
    }

    /// Nearest ancestor of the working directory holding a `.git` directory
    pub fn project_dir(&self) -> Option<PathBuf> {
        self.work_dir
            .ancestors()
            .find(|dir| dir.join(".git").is_dir())
            .map(Path::to_path_buf)
    }

    /// Property files in merge order
    pub fn property_files(&self) -> BootResult<Vec<PathBuf>> {
        let home = self.boot_home()?;
        let mut files = vec![
            home.join("cache").join(PROPERTIES_FILE),
            home.join(PROPERTIES_FILE),
        ];
        if let Some(project) = self.project_dir() {
            files.push(project.join(PROPERTIES_FILE));
        }
        files.push(self.work_dir.join(PROPERTIES_FILE));
        Ok(files)
    }
}

/// Merged `BOOT_*` key space for one invocation
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    home: PathBuf,
    work_dir: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    /// Merge all sources into a snapshot
    pub fn load(sources: &ConfigSources) -> BootResult<Self> {
        let mut values = BTreeMap::new();

        for file in sources.property_files()? {
            values.extend(read_layer(&file)?);
        }
        values.remove(keys::HOME);
        values.extend(sources.env.clone());
        values.extend(sources.overrides.clone());
        values.retain(|k, _| k.starts_with(KEY_PREFIX));

        debug!("Loaded {} configuration keys", values.len());
        Ok(Self {
            home: sources.boot_home()?,
            work_dir: sources.work_dir.clone(),
            values,
        })
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a key, recording `default` in the snapshot if it is unset
    pub fn get_or_default(&mut self, key: &str, default: &str) -> String {
        self.values
            .entry(key.to_string())
            .or_insert_with(|| default.to_string())
            .clone()
    }

    /// Installation root
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Working directory of the invocation
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// All keys, sorted
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Read one properties layer; a missing file contributes nothing
fn read_layer(path: &Path) -> BootResult<BTreeMap<String, String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(BootError::io(
                format!("reading properties from {}", path.display()),
                e,
            ))
        }
    };

    let table: toml::Table = toml::from_str(&content).map_err(|e| BootError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Read properties layer {}", path.display());
    Ok(table
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

fn scalar_to_string(value: toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
