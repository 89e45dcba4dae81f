//! Integrity checking error types.

use thiserror::Error;

/// Errors that can occur while checking a protected file.
///
/// These are per-file conditions: they are captured alongside sibling
/// results and never abort the remaining checks for a repository.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The target file exists but cannot be read.
    #[error("Permission denied reading '{path}': {source}")]
    PermissionDenied {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The approved baseline file for this check does not exist.
    #[error("Approved source missing: {path}")]
    ApprovedSourceMissing { path: String },

    /// Any other filesystem failure.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
