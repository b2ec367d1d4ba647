//! Configuration management for modsetup
//!
//! The configuration file is optional TOML holding defaults for the
//! `derive` and `check` commands. Values given on the command line always
//! take precedence over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "MODSETUP_CONFIG";

/// Keys accepted by `get`/`set`, in display order
pub const CONFIG_KEYS: &[&str] = &["metadata-path", "output-dir", "deps-prefix", "cflags-variable"];

/// Errors that can occur while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = CONFIG_KEYS.join(", "))]
    UnknownKey(String),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Path to the extension module metadata YAML file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    /// Directory receiving per-target output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Prefix for dependency include directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deps_prefix: Option<String>,
    /// Makefile variable that receives hoisted defines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cflags_variable: Option<String>,
}

impl Config {
    /// Resolve the config file location.
    ///
    /// `MODSETUP_CONFIG` wins when set and non-empty; otherwise the file lives
    /// in the platform config directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(".config");

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(base.join("modsetup").join("modsetup.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path. A missing file yields the empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "metadata-path" => &self.metadata_path,
            "output-dir" => &self.output_dir,
            "deps-prefix" => &self.deps_prefix,
            "cflags-variable" => &self.cflags_variable,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value.clone())
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        let slot = match key {
            "metadata-path" => &mut self.metadata_path,
            "output-dir" => &mut self.output_dir,
            "deps-prefix" => &mut self.deps_prefix,
            "cflags-variable" => &mut self.cflags_variable,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *slot = Some(value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values_iter().is_empty()
    }

    /// Set values as `(key, value)` pairs in `CONFIG_KEYS` order
    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| match self.get(key) {
                Ok(Some(value)) => Some((*key, value)),
                _ => None,
            })
            .collect()
    }
}
