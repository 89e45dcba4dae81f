//! Remediation of drifted or missing protected files.
//!
//! For each protected file whose current status is drift or missing, the
//! planned action overwrites (or creates) the target with the approved
//! bytes. Dry-run computes the same plan without touching the filesystem.

mod error;

pub use error::FixError;

use crate::config::IntegrityCheck;
use crate::integrity::{check_one, IntegrityError, IntegrityStatus};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// One planned (or applied) remediation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixAction {
    /// Replace a drifted file with the approved bytes.
    Overwrite { file: String },

    /// Create a missing file from the approved bytes.
    Create { file: String },

    /// The fix cannot be carried out (approved source missing, target
    /// unreadable). Reported explicitly, never skipped silently.
    Unresolvable { file: String, reason: String },
}

impl FixAction {
    /// Repository-relative path this action concerns.
    #[must_use]
    pub fn file(&self) -> &str {
        match self {
            Self::Overwrite { file } | Self::Create { file } | Self::Unresolvable { file, .. } => {
                file
            }
        }
    }
}

/// Options controlling a fix run.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Compute and report the plan without mutating the filesystem.
    pub dry_run: bool,

    /// Restrict the plan to these repository-relative files.
    pub file_filter: Option<Vec<String>>,
}

/// The computed remediation plan.
#[derive(Debug, Clone, Serialize)]
pub struct FixPlan {
    /// Actions in check order.
    pub actions: Vec<FixAction>,

    /// Whether the plan was applied or only reported.
    pub dry_run: bool,
}

impl FixPlan {
    /// True when any planned fix could not be resolved.
    #[must_use]
    pub fn has_unresolvable(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, FixAction::Unresolvable { .. }))
    }
}

/// Plans and (unless dry-run) applies fixes for drifted or missing files.
///
/// Matching files are rewritten with the approved bytes, creating parent
/// directories as needed. A check whose approved source is itself missing
/// becomes an [`FixAction::Unresolvable`] entry.
///
/// # Errors
///
/// Returns [`FixError`] only for write failures while applying; planning
/// problems are captured per-file inside the plan.
pub fn fix(
    checks: &[IntegrityCheck],
    repo_path: &Path,
    approved_base: &Path,
    options: &FixOptions,
) -> Result<FixPlan, FixError> {
    let mut actions = Vec::new();

    for check in checks {
        if let Some(filter) = &options.file_filter {
            if !filter.iter().any(|f| f == &check.file) {
                continue;
            }
        }

        let action = match check_one(check, repo_path, approved_base) {
            Ok(result) => match result.status {
                IntegrityStatus::Match => {
                    debug!(file = %check.file, "Already matches baseline");
                    continue;
                }
                IntegrityStatus::Drift => FixAction::Overwrite {
                    file: check.file.clone(),
                },
                // A missing target can still lack its baseline; creating
                // it is only resolvable when the approved bytes exist.
                IntegrityStatus::Missing => {
                    let approved_path = approved_base.join(&check.approved);
                    if approved_path.is_file() {
                        FixAction::Create {
                            file: check.file.clone(),
                        }
                    } else {
                        let e = IntegrityError::ApprovedSourceMissing {
                            path: approved_path.display().to_string(),
                        };
                        warn!(file = %check.file, error = %e, "Fix unresolvable");
                        FixAction::Unresolvable {
                            file: check.file.clone(),
                            reason: e.to_string(),
                        }
                    }
                }
            },
            Err(e @ IntegrityError::ApprovedSourceMissing { .. }) => {
                warn!(file = %check.file, error = %e, "Fix unresolvable");
                FixAction::Unresolvable {
                    file: check.file.clone(),
                    reason: e.to_string(),
                }
            }
            Err(e) => FixAction::Unresolvable {
                file: check.file.clone(),
                reason: e.to_string(),
            },
        };

        if !options.dry_run {
            if let FixAction::Overwrite { file } | FixAction::Create { file } = &action {
                apply_fix(check, file, repo_path, approved_base)?;
            }
        }

        actions.push(action);
    }

    info!(
        actions = actions.len(),
        dry_run = options.dry_run,
        "Fix plan complete"
    );
    Ok(FixPlan {
        actions,
        dry_run: options.dry_run,
    })
}

/// Copies the approved bytes over the target, creating parent directories.
fn apply_fix(
    check: &IntegrityCheck,
    file: &str,
    repo_path: &Path,
    approved_base: &Path,
) -> Result<(), FixError> {
    let approved_path = approved_base.join(&check.approved);
    let target_path = repo_path.join(file);

    let bytes = std::fs::read(&approved_path).map_err(|e| FixError::IoError {
        path: approved_path.display().to_string(),
        source: e,
    })?;

    if let Some(parent) = target_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FixError::IoError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    std::fs::write(&target_path, bytes).map_err(|e| FixError::IoError {
        path: target_path.display().to_string(),
        source: e,
    })?;

    debug!(file = %file, "Applied fix");
    Ok(())
}
