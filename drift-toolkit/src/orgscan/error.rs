//! Org scan error types.

use crate::config::ConfigError;
use crate::git::GitError;
use crate::host::HostError;
use thiserror::Error;

/// Errors that abort an organization scan.
///
/// "Config repo not found" and "named repo not found" are deliberately
/// distinct kinds, and both are distinct from a per-repo skip: a skip is
/// recorded in the summary, never raised here.
#[derive(Debug, Error)]
pub enum OrgScanError {
    /// The config repository could not be resolved; nothing was scanned.
    #[error("Config repository '{config_repo}' not found in organization '{org}'")]
    ConfigRepoNotFound { org: String, config_repo: String },

    /// An explicitly named repository does not exist on the host.
    #[error("Repository '{org}/{repo}' not found")]
    RepoNotFound { org: String, repo: String },

    /// Hosting API failure while resolving the run.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The config repository's configuration failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Git failure while fetching the config repository.
    #[error(transparent)]
    Git(#[from] GitError),

    /// An exclude pattern is not a valid glob.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Failed to create a working directory.
    #[error("Failed to create working directory: {source}")]
    WorkDir {
        #[source]
        source: std::io::Error,
    },
}
