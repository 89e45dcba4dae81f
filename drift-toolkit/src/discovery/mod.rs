//! Discovery of files that could be placed under integrity protection.
//!
//! Each configured [`DiscoveryPattern`] is glob-matched against
//! repository-relative paths. Files already protected never appear as
//! discovered.

mod error;

pub use error::DiscoveryError;

use crate::config::DiscoveryPattern;
use globset::Glob;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// A file matched by a discovery pattern.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    /// Repository-relative path with normalized `/` separators.
    pub file: String,

    /// The pattern that matched.
    pub pattern: String,

    /// Suggestion text copied from the pattern.
    pub suggestion: String,
}

/// Matches discovery patterns against a repository tree.
///
/// Output ordering is stable: pattern order first, then lexicographic path
/// order within a pattern. A file listed in `already_protected` (exact
/// relative-path match, separators normalized) is never returned. Duplicates
/// across overlapping patterns are permitted; an exact pattern/file pair is
/// emitted at most once.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when a pattern is not a valid glob or the
/// repository tree cannot be walked.
pub fn discover(
    patterns: &[DiscoveryPattern],
    repo_path: &Path,
    already_protected: &[String],
) -> Result<Vec<DiscoveryResult>, DiscoveryError> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let protected: HashSet<String> = already_protected
        .iter()
        .map(|p| normalize_separators(p))
        .collect();

    let files = collect_repo_files(repo_path)?;
    debug!(files = files.len(), patterns = patterns.len(), "Running discovery");

    let mut results = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for pattern in patterns {
        let matcher = Glob::new(&pattern.pattern)
            .map_err(|e| DiscoveryError::InvalidPattern {
                pattern: pattern.pattern.clone(),
                source: e,
            })?
            .compile_matcher();

        for file in &files {
            if !matcher.is_match(file) {
                continue;
            }
            if protected.contains(file) {
                continue;
            }
            if !seen.insert((pattern.pattern.clone(), file.clone())) {
                continue;
            }
            results.push(DiscoveryResult {
                file: file.clone(),
                pattern: pattern.pattern.clone(),
                suggestion: pattern.suggestion.clone(),
            });
        }
    }

    Ok(results)
}

/// Collects sorted repository-relative file paths, skipping `.git`.
fn collect_repo_files(repo_path: &Path) -> Result<Vec<String>, DiscoveryError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(repo_path)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| DiscoveryError::WalkError { source: e })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(repo_path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        files.push(normalize_separators(&relative));
    }

    files.sort();
    Ok(files)
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
