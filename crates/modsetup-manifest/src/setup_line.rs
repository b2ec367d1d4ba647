//! Parser for individual `Modules/Setup` lines

use crate::version::PythonVersion;
use serde::Serialize;
use std::collections::BTreeSet;

/// Directory object files are placed under, relative to the build root
pub const OBJECT_DIR: &str = "Modules";

/// Starting with 3.11 the object path keeps the source's parent directories
pub const NESTED_OBJECT_PATHS_SINCE: PythonVersion = PythonVersion::new(3, 11);

/// Structured view of a Setup line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedSetupLine {
    pub extension: String,
    /// Line with any trailing comment removed
    pub line: String,
    /// POSIX object paths derived from `.c` arguments
    pub object_paths: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
}

/// Parse a line in a `Setup.*` file.
///
/// Returns `None` for blank and comment-only lines. A line whose arguments are
/// all unrecognized still yields a record with empty sets.
pub fn parse_setup_line(line: &str, version: PythonVersion) -> Option<ParsedSetupLine> {
    let line = match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    };

    let words: Vec<&str> = line.split_whitespace().collect();
    let extension = (*words.first()?).to_string();

    let mut parsed = ParsedSetupLine {
        extension,
        line: line.trim().to_string(),
        ..Default::default()
    };

    let mut words_iter = words.iter();
    while let Some(word) = words_iter.next() {
        if let Some(stem) = word.strip_suffix(".c") {
            parsed.object_paths.insert(object_path(stem, version));
        } else if let Some(lib) = word.strip_prefix("-l") {
            parsed.links.insert(lib.to_string());
        } else if let Some(lib) = word.strip_prefix("-hidden-l") {
            parsed.links.insert(lib.to_string());
        } else if *word == "-framework" {
            if let Some(framework) = words_iter.next() {
                parsed.frameworks.insert((*framework).to_string());
            }
        }
    }

    Some(parsed)
}

/// Map a source path without its `.c` suffix to the object file makesetup emits
fn object_path(stem: &str, version: PythonVersion) -> String {
    let (parent, file) = match stem.rsplit_once('/') {
        Some((parent, file)) => (Some(parent), file),
        None => (None, stem),
    };

    match parent {
        Some(parent) if version >= NESTED_OBJECT_PATHS_SINCE => {
            let parent: Vec<&str> = parent
                .split('/')
                .filter(|seg| !seg.is_empty() && *seg != ".")
                .collect();
            if parent.is_empty() {
                format!("{}/{}.o", OBJECT_DIR, file)
            } else {
                format!("{}/{}/{}.o", OBJECT_DIR, parent.join("/"), file)
            }
        }
        _ => format!("{}/{}.o", OBJECT_DIR, file),
    }
}
