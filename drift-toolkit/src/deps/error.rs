//! Dependency detection error types.

use crate::git::GitError;
use thiserror::Error;

/// Errors that can occur during dependency change detection.
#[derive(Debug, Error)]
pub enum DepsError {
    /// Underlying git failure (unknown reference, not a repository, ...).
    #[error(transparent)]
    Git(#[from] GitError),

    /// A tracked pattern is not a valid glob.
    #[error("Invalid tracked pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
