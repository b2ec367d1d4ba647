use crate::commands::{load_config, DistArgs};
use crate::config_manager::Config;
use crate::logger;
use crate::GlobalOpts;
use anyhow::{anyhow, Result};
use clap::Args;
use modsetup_manifest::{derive_setup_local, DerivedSetup, SynthesisSettings};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETUP_LOCAL_FILE: &str = "Setup.local";
pub const MAKEFILE_EXTRA_FILE: &str = "Makefile.extra";
pub const CONFIG_C_EXTENSIONS_FILE: &str = "config_c_extensions.json";

#[derive(Args, Debug, Clone)]
pub struct DeriveCommand {
    #[command(flatten)]
    pub dist: DistArgs,

    /// Directory receiving one subdirectory per target
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix for dependency include directories
    #[arg(long, value_name = "PREFIX")]
    pub deps_prefix: Option<String>,

    /// Makefile variable that receives hoisted defines
    #[arg(long, value_name = "VARIABLE")]
    pub cflags_variable: Option<String>,

    /// Write Setup.local to stdout instead of the output directory
    #[arg(long, conflicts_with = "output_dir")]
    pub print: bool,
}

impl DeriveCommand {
    /// Command line values win over the config file, which wins over defaults
    pub fn settings(&self, config: &Config) -> SynthesisSettings {
        let defaults = SynthesisSettings::default();
        SynthesisSettings {
            dependency_include_prefix: self
                .deps_prefix
                .clone()
                .or_else(|| config.deps_prefix.clone())
                .unwrap_or(defaults.dependency_include_prefix),
            cflags_variable: self
                .cflags_variable
                .clone()
                .or_else(|| config.cflags_variable.clone())
                .unwrap_or(defaults.cflags_variable),
        }
    }

    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| config.output_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn handle_derive(cmd: DeriveCommand, opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts)?;
    let extension_modules = cmd.dist.load_metadata(&config)?;
    let dist = cmd.dist.read_dist()?;
    let settings = cmd.settings(&config);
    let targets = cmd.dist.unique_targets();

    logger::spinner_start(&format!(
        "Deriving Setup.local for {} target(s)",
        targets.len()
    ));

    let results: Vec<(String, modsetup_manifest::Result<DerivedSetup>)> = targets
        .par_iter()
        .map(|target| {
            let derived = derive_setup_local(
                &dist,
                &cmd.dist.python_version,
                target,
                &extension_modules,
                &settings,
            );
            (target.clone(), derived)
        })
        .collect();

    let (derived, failed) = split_results(results);

    if !failed.is_empty() {
        logger::spinner_error(&format!(
            "{} of {} target(s) failed",
            failed.len(),
            targets.len()
        ));
        for (target, e) in &failed {
            logger::error(&format!("{}: {}", target, e));
        }
        let names: Vec<&str> = failed.iter().map(|(t, _)| t.as_str()).collect();
        return Err(anyhow!("Derivation failed for {}", names.join(", ")));
    }

    logger::spinner_success(&format!(
        "Derived Setup.local for {} target(s)",
        derived.len()
    ));

    if cmd.print {
        let multiple = derived.len() > 1;
        for (target, setup) in &derived {
            if multiple {
                println!("# {}", target);
            }
            print!("{}", setup.setup_local);
        }
        return Ok(());
    }

    let output_dir = cmd.output_dir(&config);
    for (target, setup) in &derived {
        let target_dir = output_dir.join(target);
        write_outputs(&target_dir, setup)?;
        logger::success(&format!(
            "{}: wrote {} ({} disabled)",
            target,
            target_dir.display(),
            setup.partition.disabled.len()
        ));
    }

    Ok(())
}

/// Separate successful derivations from failures, keeping target order
pub fn split_results<T, E>(
    results: Vec<(String, Result<T, E>)>,
) -> (Vec<(String, T)>, Vec<(String, E)>) {
    let mut succeeded = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (target, result) in results {
        match result {
            Ok(value) => succeeded.push((target, value)),
            Err(e) => failed.push((target, e)),
        }
    }
    (succeeded, failed)
}

/// Write the three per-target artifacts into `dir`
pub fn write_outputs(dir: &Path, setup: &DerivedSetup) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| anyhow!("Failed to create {}: {}", dir.display(), e))?;

    let config_c = serde_json::to_string_pretty(&setup.config_c_extensions)?;

    for (name, content) in [
        (SETUP_LOCAL_FILE, setup.setup_local.clone()),
        (MAKEFILE_EXTRA_FILE, setup.make_data.clone()),
        (CONFIG_C_EXTENSIONS_FILE, format!("{}\n", config_c)),
    ] {
        let path = dir.join(name);
        fs::write(&path, content)
            .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
        logger::step(&format!("Wrote {}", path.display()));
    }

    Ok(())
}
