//! Integrity checking of protected files against an approved baseline.
//!
//! Each configured [`IntegrityCheck`] compares the live repository file
//! byte-for-byte against its approved counterpart. Comparison is whole-file;
//! there are no partial reads.

mod error;

pub use error::IntegrityError;

use crate::config::{IntegrityCheck, Severity};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Verdict for a single protected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityStatus {
    /// Live content equals the approved baseline.
    Match,
    /// Live content differs from the approved baseline.
    Drift,
    /// The protected file is absent from the repository.
    Missing,
}

impl IntegrityStatus {
    /// Returns the status as a string for report rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Drift => "drift",
            Self::Missing => "missing",
        }
    }
}

/// Result of checking one protected file.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityResult {
    /// Repository-relative path of the protected file.
    pub file: String,

    /// Verdict for this file.
    pub status: IntegrityStatus,

    /// Severity copied from the check definition.
    pub severity: Severity,
}

/// Checks one protected file against its approved baseline.
///
/// The target is read first: an absent target yields
/// [`IntegrityStatus::Missing`] without consulting the baseline. An
/// unreadable target due to access denial is surfaced as
/// [`IntegrityError::PermissionDenied`], never folded into `Missing`. An
/// absent approved file for a present target is surfaced as
/// [`IntegrityError::ApprovedSourceMissing`], never reported as a match.
///
/// # Errors
///
/// Returns [`IntegrityError`] for the conditions above and for any other
/// filesystem failure.
pub fn check_one(
    check: &IntegrityCheck,
    repo_path: &Path,
    approved_base: &Path,
) -> Result<IntegrityResult, IntegrityError> {
    let target_path = repo_path.join(&check.file);
    let approved_path = approved_base.join(&check.approved);

    let target = match std::fs::read(&target_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(file = %check.file, "Protected file missing");
            return Ok(IntegrityResult {
                file: check.file.clone(),
                status: IntegrityStatus::Missing,
                severity: check.severity,
            });
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(IntegrityError::PermissionDenied {
                path: target_path.display().to_string(),
                source: e,
            });
        }
        Err(e) => {
            return Err(IntegrityError::IoError {
                path: target_path.display().to_string(),
                source: e,
            });
        }
    };

    let approved = match std::fs::read(&approved_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IntegrityError::ApprovedSourceMissing {
                path: approved_path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(IntegrityError::IoError {
                path: approved_path.display().to_string(),
                source: e,
            });
        }
    };

    let status = if target == approved {
        IntegrityStatus::Match
    } else {
        IntegrityStatus::Drift
    };

    Ok(IntegrityResult {
        file: check.file.clone(),
        status,
        severity: check.severity,
    })
}

/// Checks all protected files, capturing per-file errors alongside results.
///
/// A failing check never aborts its siblings; each error is returned in
/// input order next to the check that produced it.
pub fn check_all(
    checks: &[IntegrityCheck],
    repo_path: &Path,
    approved_base: &Path,
) -> Vec<Result<IntegrityResult, IntegrityError>> {
    checks
        .iter()
        .map(|check| {
            let result = check_one(check, repo_path, approved_base);
            if let Err(e) = &result {
                warn!(file = %check.file, error = %e, "Integrity check error");
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn check(file: &str) -> IntegrityCheck {
        IntegrityCheck {
            file: file.to_string(),
            approved: file.to_string(),
            severity: Severity::Critical,
        }
    }

    #[test]
    fn identical_content_matches() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(repo.path().join("CODEOWNERS"), "* @a\n").unwrap();
        fs::write(approved.path().join("CODEOWNERS"), "* @a\n").unwrap();

        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Match);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn differing_content_is_drift() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(repo.path().join("CODEOWNERS"), "* @a\n").unwrap();
        fs::write(approved.path().join("CODEOWNERS"), "* @b\n").unwrap();

        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Drift);
    }

    #[test]
    fn absent_target_is_missing() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(approved.path().join("CODEOWNERS"), "* @a\n").unwrap();

        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Missing);
    }

    #[test]
    fn absent_target_wins_over_absent_approved_source() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();

        // Neither side exists: the target verdict is decided first.
        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Missing);
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_target_is_permission_denied_not_missing() {
        use std::os::unix::fs::PermissionsExt;

        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        let target = repo.path().join("CODEOWNERS");
        fs::write(&target, "* @a\n").unwrap();
        fs::write(approved.path().join("CODEOWNERS"), "* @a\n").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o000)).unwrap();

        // Access checks do not apply to root; nothing to observe then.
        if fs::read(&target).is_ok() {
            return;
        }

        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path());
        assert!(matches!(
            result,
            Err(IntegrityError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn absent_approved_source_is_an_error() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(repo.path().join("CODEOWNERS"), "* @a\n").unwrap();

        let result = check_one(&check("CODEOWNERS"), repo.path(), approved.path());
        assert!(matches!(
            result,
            Err(IntegrityError::ApprovedSourceMissing { .. })
        ));
    }

    #[test]
    fn comparison_is_byte_exact_for_large_content() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();

        // 1 MiB payload differing only in the final byte.
        let mut a = vec![0x41u8; 1024 * 1024];
        let mut b = a.clone();
        fs::write(repo.path().join("big.bin"), &a).unwrap();
        fs::write(approved.path().join("big.bin"), &b).unwrap();

        let result = check_one(&check("big.bin"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Match);

        *b.last_mut().unwrap() = 0x42;
        fs::write(approved.path().join("big.bin"), &b).unwrap();
        let result = check_one(&check("big.bin"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Drift);

        *a.last_mut().unwrap() = 0x42;
        fs::write(repo.path().join("big.bin"), &a).unwrap();
        let result = check_one(&check("big.bin"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Match);
    }

    #[test]
    fn unicode_paths_and_content() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(repo.path().join("справка.md"), "内容 🚀\n").unwrap();
        fs::write(approved.path().join("справка.md"), "内容 🚀\n").unwrap();

        let result = check_one(&check("справка.md"), repo.path(), approved.path()).unwrap();
        assert_eq!(result.status, IntegrityStatus::Match);
    }

    #[test]
    fn check_all_preserves_order_and_captures_errors() {
        let repo = TempDir::new().unwrap();
        let approved = TempDir::new().unwrap();
        fs::write(repo.path().join("a.txt"), "x").unwrap();
        fs::write(approved.path().join("a.txt"), "x").unwrap();
        fs::write(repo.path().join("b.txt"), "y").unwrap();
        fs::write(approved.path().join("c.txt"), "z").unwrap();

        let checks = vec![check("a.txt"), check("b.txt"), check("c.txt")];
        let results = check_all(&checks, repo.path(), approved.path());

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap().status,
            IntegrityStatus::Match
        );
        assert!(matches!(
            results[1],
            Err(IntegrityError::ApprovedSourceMissing { .. })
        ));
        assert_eq!(
            results[2].as_ref().unwrap().status,
            IntegrityStatus::Missing
        );
    }
}
