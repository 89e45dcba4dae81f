//! Org scan summary types.

use crate::host::IssueOutcome;
use crate::report::RepoReport;

/// Result of processing a single repository in an org run.
#[derive(Debug, Clone)]
pub enum RepoScanResult {
    /// The repository was cloned and fully scanned.
    Scanned {
        /// Repository full name.
        repository: String,
        /// The merged per-repo report.
        report: RepoReport,
        /// Issue outcome when one was created or found, `None` in dry-run
        /// or for passing repositories.
        issue: Option<IssueOutcome>,
    },

    /// The repository was skipped before or during scanning.
    Skipped {
        /// Repository full name.
        repository: String,
        /// Specific missing-artifact or filter reason.
        reason: String,
    },

    /// The repository could not be processed (clone or host failure).
    Failed {
        /// Repository full name.
        repository: String,
        /// Error message.
        error: String,
    },
}

/// Summary of a complete organization scan.
#[derive(Debug, Clone, Default)]
pub struct OrgScanSummary {
    /// Organization scanned.
    pub org: String,

    /// Config repository the run resolved.
    pub config_repo: String,

    /// Candidate repositories enumerated (after any repo filter).
    pub total_repos: usize,

    /// Repositories removed by exclude patterns before cloning.
    pub excluded_repos: usize,

    /// Repositories removed by the recent-activity window.
    pub inactive_repos: usize,

    /// Repositories fully scanned.
    pub scanned_repos: usize,

    /// Repositories skipped (not scannable).
    pub skipped_repos: usize,

    /// Scanned repositories with no failures.
    pub passed_repos: usize,

    /// Repositories that failed checks or could not be processed.
    pub failed_repos: usize,

    /// Tracking issues newly created this run.
    pub issues_created: usize,

    /// Whether side effects were disabled.
    pub dry_run: bool,
}

impl OrgScanSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(org: &str, config_repo: &str, dry_run: bool) -> Self {
        Self {
            org: org.to_string(),
            config_repo: config_repo.to_string(),
            dry_run,
            ..Default::default()
        }
    }

    /// Folds one repository result into the counters.
    pub fn record_result(&mut self, result: &RepoScanResult) {
        match result {
            RepoScanResult::Scanned { report, issue, .. } => {
                self.scanned_repos += 1;
                if report.has_failures() {
                    self.failed_repos += 1;
                } else {
                    self.passed_repos += 1;
                }
                if matches!(issue, Some(IssueOutcome::Created { .. })) {
                    self.issues_created += 1;
                }
            }
            RepoScanResult::Skipped { .. } => self.skipped_repos += 1,
            RepoScanResult::Failed { .. } => self.failed_repos += 1,
        }
    }

    /// Returns true if any repository failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_repos > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Scannability;

    fn scannable() -> Scannability {
        Scannability {
            scannable: true,
            has_metadata: true,
            has_check_manifest: true,
        }
    }

    #[test]
    fn records_scanned_and_skipped() {
        let mut summary = OrgScanSummary::new("acme", "drift-config", false);

        summary.record_result(&RepoScanResult::Scanned {
            repository: "acme/clean".to_string(),
            report: RepoReport::new("acme/clean".to_string(), scannable()),
            issue: None,
        });
        summary.record_result(&RepoScanResult::Skipped {
            repository: "acme/bare".to_string(),
            reason: "missing check.toml".to_string(),
        });
        summary.record_result(&RepoScanResult::Failed {
            repository: "acme/broken".to_string(),
            error: "clone failed".to_string(),
        });

        assert_eq!(summary.scanned_repos, 1);
        assert_eq!(summary.passed_repos, 1);
        assert_eq!(summary.skipped_repos, 1);
        assert_eq!(summary.failed_repos, 1);
        assert!(summary.has_failures());
    }
}
