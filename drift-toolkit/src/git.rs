//! Git access boundary.
//!
//! The engine treats a repository's history as a read-only store keyed by
//! commit hash, reached through the [`GitClient`] trait so the dependency
//! change detector is testable against an in-memory fake. [`SystemGit`]
//! implements the trait by shelling out to the `git` binary.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors that can occur while talking to git.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not inside a git working directory.
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    /// A reference could not be resolved to a commit.
    #[error("Unknown git reference '{reference}': {detail}")]
    UnknownRef { reference: String, detail: String },

    /// A git invocation exited nonzero.
    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    /// The git binary could not be executed.
    #[error("Failed to execute git: {source}")]
    IoError {
        #[source]
        source: std::io::Error,
    },
}

/// Per-path status in a tree diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl ChangeStatus {
    /// Returns the status as a string for report rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

/// One changed path between two commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    /// Repository-relative path.
    pub path: String,

    /// How the path changed.
    pub status: ChangeStatus,
}

/// Read-only view of a git repository's history.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Whether `path` is a git working directory.
    async fn is_repo(&self, path: &Path) -> bool;

    /// Resolves a reference to a full commit hash.
    async fn resolve_commit(&self, path: &Path, reference: &str) -> Result<String, GitError>;

    /// Resolves `HEAD` to a full commit hash.
    async fn head_commit(&self, path: &Path) -> Result<String, GitError>;

    /// Lists changed paths between two commits (tree diff, not working tree).
    async fn diff_tree(
        &self,
        path: &Path,
        base: &str,
        target: &str,
    ) -> Result<Vec<TreeChange>, GitError>;

    /// Lists all file paths present in the tree at a commit.
    async fn ls_tree(&self, path: &Path, reference: &str) -> Result<Vec<String>, GitError>;

    /// Clones a repository (shallow) into `dest`.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;
}

/// [`GitClient`] implementation backed by the system `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

#[async_trait]
impl GitClient for SystemGit {
    async fn is_repo(&self, path: &Path) -> bool {
        run_git(path, &["rev-parse", "--git-dir"]).await.is_ok()
    }

    async fn resolve_commit(&self, path: &Path, reference: &str) -> Result<String, GitError> {
        if !self.is_repo(path).await {
            return Err(GitError::NotARepository {
                path: path.display().to_string(),
            });
        }
        let verified = format!("{reference}^{{commit}}");
        run_git(path, &["rev-parse", "--verify", &verified])
            .await
            .map(|out| out.trim().to_string())
            .map_err(|e| GitError::UnknownRef {
                reference: reference.to_string(),
                detail: e.to_string(),
            })
    }

    async fn head_commit(&self, path: &Path) -> Result<String, GitError> {
        self.resolve_commit(path, "HEAD").await
    }

    async fn diff_tree(
        &self,
        path: &Path,
        base: &str,
        target: &str,
    ) -> Result<Vec<TreeChange>, GitError> {
        let output = run_git(
            path,
            &[
                "diff-tree",
                "-r",
                "--name-status",
                "--no-commit-id",
                "--no-renames",
                base,
                target,
            ],
        )
        .await?;
        Ok(parse_name_status(&output))
    }

    async fn ls_tree(&self, path: &Path, reference: &str) -> Result<Vec<String>, GitError> {
        let output = run_git(path, &["ls-tree", "-r", "--name-only", reference]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        debug!(dest = %dest.display(), "Cloning repository");
        run_git(dest, &["clone", "--depth", "1", url, "."]).await?;
        Ok(())
    }
}

/// Parses `--name-status` output lines like `M\tpath/to/file`.
fn parse_name_status(output: &str) -> Vec<TreeChange> {
    output
        .lines()
        .filter_map(|line| {
            let (status, path) = line.split_once('\t')?;
            let status = match status.chars().next()? {
                'A' => ChangeStatus::Added,
                'M' | 'T' => ChangeStatus::Modified,
                'D' => ChangeStatus::Deleted,
                _ => return None,
            };
            Some(TreeChange {
                path: path.to_string(),
                status,
            })
        })
        .collect()
}

/// Runs a git command, returning stdout on success.
async fn run_git(path: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| GitError::IoError { source: e })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::CommandFailed {
            args: args.join(" "),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
