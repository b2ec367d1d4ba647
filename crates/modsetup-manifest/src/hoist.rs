//! Hoisting of `-DNAME=VALUE` defines out of Setup lines
//!
//! makesetup treats any line containing `=` as a variable assignment, so a
//! define with a value cannot appear in `Setup.local`. Such defines are moved
//! into Makefile rules that extend the CFLAGS variable for the module's object
//! files instead.

use crate::errors::{ManifestError, Result};
use crate::setup_line::ParsedSetupLine;
use crate::synthesize::SetupLine;
use std::collections::BTreeMap;

/// Per-object-file defines collected across all modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CflagsOverrides {
    entries: BTreeMap<String, Vec<String>>,
}

impl CflagsOverrides {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, object_path: &str) -> Option<&[String]> {
        self.entries.get(object_path).map(Vec::as_slice)
    }

    /// Attach `defines` to every object file of `parsed`
    pub fn record(&mut self, parsed: &ParsedSetupLine, defines: &[String]) {
        if defines.is_empty() {
            return;
        }
        for object_path in &parsed.object_paths {
            self.entries
                .entry(object_path.clone())
                .or_default()
                .extend(defines.iter().cloned());
        }
    }

    /// Makefile rules, one per object file, sorted by path
    pub fn render(&self, variable: &str) -> String {
        self.entries
            .iter()
            .map(|(object_path, defines)| {
                format!("{}: {} += {}", object_path, variable, defines.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A Setup line with its valued defines split off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedLine {
    pub line: SetupLine,
    /// Removed defines in order of appearance
    pub defines: Vec<String>,
}

/// Whether `token` is a `-DNAME=VALUE` define
pub fn is_valued_define(token: &str) -> bool {
    token
        .strip_prefix("-D")
        .and_then(|rest| rest.split_once('='))
        .is_some_and(|(name, value)| !name.is_empty() && !value.is_empty())
}

/// Split valued defines out of `line`.
///
/// Fails if an `=` survives in the remaining tokens, since makesetup would
/// misread the line.
pub fn hoist_defines(line: &SetupLine) -> Result<HoistedLine> {
    let (defines, tokens): (Vec<String>, Vec<String>) = line
        .tokens
        .iter()
        .cloned()
        .partition(|token| is_valued_define(token));

    let hoisted = HoistedLine {
        line: SetupLine { tokens },
        defines,
    };

    if hoisted.line.tokens.iter().any(|t| t.contains('=')) {
        return Err(ManifestError::InternalConsistency(format!(
            "= appears in EXTRA_MODULES line; will confuse makesetup: {}",
            hoisted.line.render()
        )));
    }

    Ok(hoisted)
}
