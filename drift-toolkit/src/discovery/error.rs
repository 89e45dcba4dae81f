//! Discovery error types.

use thiserror::Error;

/// Errors that can occur during suggestion discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A discovery pattern is not a valid glob.
    #[error("Invalid discovery pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Failed to walk the repository tree.
    #[error("Failed to walk repository: {source}")]
    WalkError {
        #[source]
        source: walkdir::Error,
    },
}
