//! Dependency change detection between two commits.
//!
//! Diffs two commit trees and classifies the changed paths against the
//! configured tracked patterns. The check manifest is always tracked,
//! regardless of pattern matches; untracked changed paths are dropped.

mod error;

pub use error::DepsError;

use crate::config::TrackedPattern;
use crate::git::{ChangeStatus, GitClient};
use crate::metadata::CHECK_MANIFEST;
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Check-type bucket assigned to the always-tracked manifest.
pub const MANIFEST_CHECK_TYPE: &str = "manifest";

/// A tracked file that changed between the two commits.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyChange {
    /// Repository-relative path.
    pub file: String,

    /// How the path changed.
    pub status: ChangeStatus,

    /// Check-type bucket this change belongs to.
    pub check_type: String,

    /// True for the check manifest, which is tracked unconditionally.
    pub always_tracked: bool,
}

/// Classified changes between two commits.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyChangesDetection {
    /// All tracked changes, in diff order.
    pub changes: Vec<DependencyChange>,

    /// Changes bucketed by check type; every change is in exactly one bucket.
    pub by_check: BTreeMap<String, Vec<DependencyChange>>,

    /// The subset of changes with `always_tracked = true`.
    pub always_tracked_changes: Vec<DependencyChange>,

    /// Size of the tracked-file universe at the target commit.
    pub total_tracked_files: usize,

    /// True iff `changes` is non-empty.
    pub has_changes: bool,
}

/// Commit range for a detection.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Older end of the range (any resolvable reference).
    pub base_commit: String,

    /// Newer end of the range (any resolvable reference).
    pub target_commit: String,
}

/// Detects tracked dependency-file changes between two commits.
///
/// Equal `base_commit`/`target_commit` deterministically yields an empty
/// change set with `has_changes = false`; the tracked-file count is still
/// computed at the target commit.
///
/// # Errors
///
/// Returns [`DepsError`] when a reference cannot be resolved, the path is
/// not a git repository, or a tracked pattern is not a valid glob.
pub async fn detect_dependency_changes(
    git: &dyn GitClient,
    tracked: &[TrackedPattern],
    repo_path: &Path,
    options: &DetectOptions,
) -> Result<DependencyChangesDetection, DepsError> {
    let matchers = compile_matchers(tracked)?;

    let base = git.resolve_commit(repo_path, &options.base_commit).await?;
    let target = git.resolve_commit(repo_path, &options.target_commit).await?;

    let total_tracked_files = count_tracked_files(git, &matchers, repo_path, &target).await?;

    if base == target {
        debug!(commit = %base, "No-op range, nothing to detect");
        return Ok(DependencyChangesDetection {
            total_tracked_files,
            ..Default::default()
        });
    }

    let tree_changes = git.diff_tree(repo_path, &base, &target).await?;

    let mut changes = Vec::new();
    for change in tree_changes {
        let Some((check_type, always_tracked)) = classify(&change.path, &matchers) else {
            continue;
        };
        changes.push(DependencyChange {
            file: change.path,
            status: change.status,
            check_type,
            always_tracked,
        });
    }

    let mut by_check: BTreeMap<String, Vec<DependencyChange>> = BTreeMap::new();
    for change in &changes {
        by_check
            .entry(change.check_type.clone())
            .or_default()
            .push(change.clone());
    }

    let always_tracked_changes = changes
        .iter()
        .filter(|c| c.always_tracked)
        .cloned()
        .collect();

    info!(
        changes = changes.len(),
        tracked = total_tracked_files,
        "Dependency change detection complete"
    );

    let has_changes = !changes.is_empty();
    Ok(DependencyChangesDetection {
        changes,
        by_check,
        always_tracked_changes,
        total_tracked_files,
        has_changes,
    })
}

/// Assigns a changed path to its check-type bucket.
///
/// The check manifest wins unconditionally; otherwise the first matching
/// tracked pattern decides. Unmatched paths are untracked.
fn classify(path: &str, matchers: &[(GlobMatcher, String)]) -> Option<(String, bool)> {
    if path == CHECK_MANIFEST {
        return Some((MANIFEST_CHECK_TYPE.to_string(), true));
    }
    matchers
        .iter()
        .find(|(matcher, _)| matcher.is_match(path))
        .map(|(_, check_type)| (check_type.clone(), false))
}

/// Counts the tracked-file universe present at a commit.
async fn count_tracked_files(
    git: &dyn GitClient,
    matchers: &[(GlobMatcher, String)],
    repo_path: &Path,
    target: &str,
) -> Result<usize, DepsError> {
    let files = git.ls_tree(repo_path, target).await?;
    Ok(files
        .iter()
        .filter(|path| classify(path, matchers).is_some())
        .count())
}

fn compile_matchers(tracked: &[TrackedPattern]) -> Result<Vec<(GlobMatcher, String)>, DepsError> {
    tracked
        .iter()
        .map(|t| {
            Glob::new(&t.pattern)
                .map(|glob| (glob.compile_matcher(), t.check_type.clone()))
                .map_err(|e| DepsError::InvalidPattern {
                    pattern: t.pattern.clone(),
                    source: e,
                })
        })
        .collect()
}
