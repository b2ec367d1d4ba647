use crate::commands::{load_config, DistArgs};
use crate::logger;
use crate::GlobalOpts;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::*;
use modsetup_manifest::{check_consistency, ConsistencyCheck};
use rayon::prelude::*;

#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    #[command(flatten)]
    pub dist: DistArgs,
}

pub fn handle_check(cmd: CheckCommand, opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts)?;
    let extension_modules = cmd.dist.load_metadata(&config)?;
    let dist = cmd.dist.read_dist()?;
    let targets = cmd.dist.unique_targets();

    let results: Vec<(String, modsetup_manifest::Result<ConsistencyCheck>)> = targets
        .par_iter()
        .map(|target| {
            let check =
                check_consistency(&dist, &cmd.dist.python_version, target, &extension_modules);
            (target.clone(), check)
        })
        .collect();

    let mut failed = Vec::new();
    for (target, result) in results {
        match result {
            Ok(check) if check.report.is_clean() => {
                println!(
                    "{} {} ({} modules, {} disabled, {} ignored)",
                    "ok".green().bold(),
                    target,
                    check.modules.len(),
                    check.partition.disabled.len(),
                    check.partition.ignored.len()
                );
            }
            Ok(check) => {
                println!("{} {}", "FAILED".red().bold(), target);
                logger::error(&format!(
                    "{}: metadata disagrees with Python-{}:\n{}",
                    target, cmd.dist.python_version, check.report
                ));
                failed.push(target);
            }
            Err(e) => {
                println!("{} {}", "FAILED".red().bold(), target);
                logger::error(&format!("{}: {}", target, e));
                failed.push(target);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Consistency check failed for {}", failed.join(", ")))
    }
}
