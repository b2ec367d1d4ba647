//! Python version parsing and range checks
//!
//! Only the major and minor components take part in comparisons; anything
//! after the second dot (`3.11.4`, `3.13.0rc1`) is ignored.

use crate::errors::{ManifestError, Result};
use std::fmt;
use std::str::FromStr;

/// A `MAJOR.MINOR` Python version, ordered as a `(major, minor)` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        PythonVersion { major, minor }
    }
}

impl FromStr for PythonVersion {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ManifestError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        Ok(PythonVersion { major, minor })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Inclusive version range; a missing bound is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<PythonVersion>,
    pub max: Option<PythonVersion>,
}

impl VersionRange {
    /// Range covering every version
    pub const ANY: VersionRange = VersionRange {
        min: None,
        max: None,
    };

    /// Build a range from the optional metadata strings
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        Ok(VersionRange {
            min: min.map(str::parse::<PythonVersion>).transpose()?,
            max: max.map(str::parse::<PythonVersion>).transpose()?,
        })
    }

    pub fn contains(&self, version: PythonVersion) -> bool {
        self.min.map_or(true, |min| version >= min) && self.max.map_or(true, |max| version <= max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}
