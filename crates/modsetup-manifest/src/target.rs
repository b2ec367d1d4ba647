//! Target triple matching and platform capabilities

use crate::errors::{ManifestError, Result};
use crate::version::PythonVersion;
use regex::Regex;
use smallvec::SmallVec;

// =============================================================================
// TARGET MATCHER
// =============================================================================

/// Compiled set of target triple patterns.
///
/// Patterns are anchored at the start of the triple, so `x86_64-.*` matches
/// `x86_64-unknown-linux-gnu` but `linux` does not. An empty set matches
/// every target.
#[derive(Debug, Clone, Default)]
pub struct TargetMatcher {
    patterns: SmallVec<[Regex; 2]>,
}

impl TargetMatcher {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
                    ManifestError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<SmallVec<[Regex; 2]>>>()?;
        Ok(TargetMatcher { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, target_triple: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|re| re.is_match(target_triple))
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Target family, derived once per run from the triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Apple,
    Linux,
    Windows,
    Other,
}

impl Platform {
    pub fn from_triple(target_triple: &str) -> Self {
        if target_triple.contains("-apple-") {
            Platform::Apple
        } else if target_triple.contains("-linux") {
            Platform::Linux
        } else if target_triple.contains("-windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    /// Link static libraries with `-hidden-l` so their symbols are not
    /// re-exported from the interpreter.
    pub fn hides_static_symbols(self) -> bool {
        self == Platform::Apple
    }

    pub fn supports_frameworks(self) -> bool {
        self == Platform::Apple
    }

    /// Dependency headers come from the global search path, not per-module `-I`.
    pub fn uses_global_dependency_includes(self) -> bool {
        self == Platform::Apple
    }

    /// Render a library as a link flag for this platform
    pub fn link_flag(self, lib: &str) -> String {
        if self.hides_static_symbols() {
            format!("-Xlinker -hidden-l{}", lib)
        } else {
            format!("-l{}", lib)
        }
    }
}

// =============================================================================
// BUILD CONTEXT
// =============================================================================

/// The (version, target) pair a single derivation runs against
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub version: PythonVersion,
    pub target_triple: String,
    pub platform: Platform,
}

impl BuildContext {
    pub fn new(version: PythonVersion, target_triple: &str) -> Self {
        BuildContext {
            version,
            target_triple: target_triple.to_string(),
            platform: Platform::from_triple(target_triple),
        }
    }

    pub fn parse(python_version: &str, target_triple: &str) -> Result<Self> {
        Ok(Self::new(python_version.parse()?, target_triple))
    }
}
