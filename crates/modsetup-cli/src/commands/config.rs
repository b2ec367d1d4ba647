use crate::commands::{config_path, load_config};
use crate::logger;
use crate::GlobalOpts;
use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::*;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show every configured value
    Show,
    /// Print a single value (metadata-path, output-dir, deps-prefix, cflags-variable)
    Get { key: String },
    /// Set a value and save the config file
    Set { key: String, value: String },
    /// Print the path of the config file in use
    Path,
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = load_config(opts)?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Get { key } => match load_config(opts)?.get(&key)? {
            Some(value) => println!("{}", value),
            None => logger::debug(&format!("{} is not set", key)),
        },
        ConfigAction::Set { key, value } => {
            let mut config = load_config(opts)?;
            config.set(&key, value.clone())?;
            let saved = match &opts.config {
                Some(path) => config.save_to(path),
                None => config.save(),
            };
            saved.map_err(|e| anyhow!("Failed to save config: {}", e))?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            println!("{}", config_path(opts)?.display());
        }
    }

    Ok(())
}
