use crate::reconcile::ReconciliationReport;
use std::io;
use thiserror::Error;

/// Errors that can occur while deriving `Setup.local`
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse extension module metadata: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid Python version '{0}': expected MAJOR.MINOR")]
    InvalidVersion(String),

    #[error("Invalid target pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid extension module metadata: {0}")]
    InvalidMetadata(String),

    #[error("Source distribution is missing {path}")]
    MissingDistFile { path: String },

    #[error("Extension module metadata disagrees with the source distribution:\n{0}")]
    Reconciliation(ReconciliationReport),

    #[error("Internal consistency error (Setup.local generator defect): {0}")]
    InternalConsistency(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
