pub mod check;
pub mod config;
pub mod derive;
pub mod parse_line;

use crate::config_manager::Config;
use crate::logger;
use crate::GlobalOpts;
use anyhow::{anyhow, Result};
use clap::Args;
use modsetup_manifest::{load_extension_modules, read_dist_manifests, DistManifests, ExtensionModules};
use std::path::PathBuf;

/// Inputs shared by every command that reads a source distribution
#[derive(Args, Debug, Clone)]
pub struct DistArgs {
    /// CPython source tarball or extracted source tree
    #[arg(long, value_name = "PATH")]
    pub source: PathBuf,

    /// Full Python version of the distribution (e.g. 3.11.4)
    #[arg(long, value_name = "VERSION")]
    pub python_version: String,

    /// Target triple to build for; repeat for several targets
    #[arg(long = "target", value_name = "TRIPLE", required = true)]
    pub targets: Vec<String>,

    /// Extension module metadata YAML (defaults to `metadata-path` from config)
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,
}

impl DistArgs {
    /// Requested targets in order of appearance, duplicates dropped
    pub fn unique_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if !targets.contains(target) {
                targets.push(target.clone());
            }
        }
        targets
    }

    pub fn metadata_path(&self, config: &Config) -> Result<PathBuf> {
        self.metadata
            .clone()
            .or_else(|| config.metadata_path.as_ref().map(PathBuf::from))
            .ok_or_else(|| {
                anyhow!("No extension module metadata given. Pass --metadata or set metadata-path in the config")
            })
    }

    pub fn load_metadata(&self, config: &Config) -> Result<ExtensionModules> {
        let path = self.metadata_path(config)?;
        logger::debug(&format!("Loading extension module metadata from {}", path.display()));
        load_extension_modules(&path)
            .map_err(|e| anyhow!("Failed to load metadata {}: {}", path.display(), e))
    }

    pub fn read_dist(&self) -> Result<DistManifests> {
        logger::debug(&format!(
            "Reading Python-{} manifests from {}",
            self.python_version,
            self.source.display()
        ));
        read_dist_manifests(&self.source, &self.python_version)
            .map_err(|e| anyhow!("Failed to read {}: {}", self.source.display(), e))
    }
}

/// Config file location honoring `--config`
pub fn config_path(opts: &GlobalOpts) -> Result<PathBuf> {
    match &opts.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::path()?),
    }
}

pub fn load_config(opts: &GlobalOpts) -> Result<Config> {
    let path = config_path(opts)?;
    logger::debug(&format!("Reading config from: {}", path.display()));
    let loaded = match &opts.config {
        Some(explicit) => Config::load_from(explicit),
        None => Config::load(),
    };
    loaded.map_err(|e| anyhow!("Failed to load config {}: {}", path.display(), e))
}
