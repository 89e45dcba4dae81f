//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading the drift configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("Failed to parse configuration in '{path}': {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Validation error in the configuration.
    #[error("Validation error in '{path}': {message}")]
    ValidationError { path: String, message: String },
}
