use anyhow::{anyhow, Result};
use clap::Args;
use colored::*;
use modsetup_manifest::{parse_setup_line, ParsedSetupLine, PythonVersion};
use std::collections::BTreeSet;

#[derive(Args, Debug, Clone)]
pub struct ParseLineCommand {
    /// Python version whose object path rules apply (e.g. 3.11)
    #[arg(long, value_name = "VERSION")]
    pub python_version: String,

    /// Print the parsed record as JSON
    #[arg(long)]
    pub json: bool,

    /// The Setup line to parse
    pub line: String,
}

pub fn handle_parse_line(cmd: ParseLineCommand) -> Result<()> {
    let version: PythonVersion = cmd.python_version.parse()?;
    let parsed = parse_setup_line(&cmd.line, version)
        .ok_or_else(|| anyhow!("Not a Setup line: {:?}", cmd.line))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        print!("{}", render(&parsed));
    }
    Ok(())
}

fn render(parsed: &ParsedSetupLine) -> String {
    let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(" ");
    format!(
        "{} {}\n{} {}\n{} {}\n{} {}\n",
        "extension:".cyan(),
        parsed.extension,
        "objects:".cyan(),
        join(&parsed.object_paths),
        "links:".cyan(),
        join(&parsed.links),
        "frameworks:".cyan(),
        join(&parsed.frameworks),
    )
}
