//! Hosting API error types.

use thiserror::Error;

/// Errors that can occur while talking to the hosting API.
#[derive(Debug, Error)]
pub enum HostError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    GitHubError(#[from] octocrab::Error),

    /// Permission denied.
    #[error("Permission denied: no write access to {owner}/{repo}")]
    PermissionDenied { owner: String, repo: String },
}
