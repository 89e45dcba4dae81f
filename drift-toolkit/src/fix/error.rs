//! Fix engine error types.

use thiserror::Error;

/// Errors that can occur while applying fixes.
#[derive(Debug, Error)]
pub enum FixError {
    /// Failed to read or write a file while applying a fix.
    #[error("Failed to access '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
