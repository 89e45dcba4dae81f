//! Per-repository report assembly.
//!
//! A [`RepoReport`] merges the outcomes of every check family run against a
//! repository. The report is the single place that decides whether a run is
//! clean: any material warning or failure makes it non-clean, so a
//! repository can never silently read "all checks passed" while something
//! went wrong.

mod violation;

pub use violation::Violation;

use crate::config::Severity;
use crate::discovery::DiscoveryResult;
use crate::integrity::{IntegrityResult, IntegrityStatus};
use crate::metadata::Scannability;
use crate::scan::{ScanResult, ScanStatus};
use serde::Serialize;

/// Merged outcomes of one repository scan.
#[derive(Debug, Clone, Serialize)]
pub struct RepoReport {
    /// Repository identifier (path or `org/name`).
    pub repository: String,

    /// Whether the repository carried the scanning prerequisites.
    #[serde(skip)]
    pub scannability: Scannability,

    /// Warning-grade metadata conditions, rendered.
    pub metadata_warnings: Vec<String>,

    /// Per-protected-file verdicts.
    pub integrity: Vec<IntegrityResult>,

    /// Per-file check errors (permission denied, missing baseline, bad
    /// discovery pattern).
    pub check_errors: Vec<String>,

    /// Files suggested for protection.
    pub discoveries: Vec<DiscoveryResult>,

    /// Per-scan outcomes.
    pub scans: Vec<ScanResult>,
}

impl RepoReport {
    /// Creates an empty report for a repository.
    #[must_use]
    pub fn new(repository: String, scannability: Scannability) -> Self {
        Self {
            repository,
            scannability,
            metadata_warnings: Vec::new(),
            integrity: Vec::new(),
            check_errors: Vec::new(),
            discoveries: Vec::new(),
            scans: Vec::new(),
        }
    }

    /// Collects every violation in the report as a closed variant set.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(reason) = self.scannability.skip_reason() {
            violations.push(Violation::NotScannable { reason });
        }

        for warning in &self.metadata_warnings {
            violations.push(Violation::MetadataWarning {
                detail: warning.clone(),
            });
        }

        for result in &self.integrity {
            match result.status {
                IntegrityStatus::Match => {}
                IntegrityStatus::Drift => violations.push(Violation::Drift {
                    file: result.file.clone(),
                    severity: result.severity,
                }),
                IntegrityStatus::Missing => violations.push(Violation::MissingProtected {
                    file: result.file.clone(),
                    severity: result.severity,
                }),
            }
        }

        for error in &self.check_errors {
            violations.push(Violation::CheckError {
                detail: error.clone(),
            });
        }

        for scan in &self.scans {
            if scan.status == ScanStatus::Fail {
                violations.push(Violation::FailedScan {
                    name: scan.scan.clone(),
                    severity: scan.severity,
                });
            }
        }

        violations
    }

    /// True when nothing in the report needs attention.
    ///
    /// Missing metadata, a missing check manifest, malformed YAML, integrity
    /// errors, drift and failed scans all make a report non-clean.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations().is_empty()
    }

    /// True when the report contains a drift, missing file, failed scan, or
    /// integrity error (the conditions that fail a repository outright).
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.violations().iter().any(|v| {
            matches!(
                v,
                Violation::Drift { .. }
                    | Violation::MissingProtected { .. }
                    | Violation::FailedScan { .. }
                    | Violation::CheckError { .. }
            )
        })
    }

    /// Highest severity among the report's violations.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations().iter().filter_map(Violation::severity).max()
    }

    /// Stable signature of the current violation set.
    ///
    /// Two runs observing the same violations produce the same signature, so
    /// the issue reporter can dedupe across runs.
    #[must_use]
    pub fn violation_signature(&self) -> String {
        let mut keys: Vec<String> = self.violations().iter().map(Violation::key).collect();
        keys.sort();
        keys.dedup();
        keys.join(",")
    }

    /// Title for a tracking issue about this report.
    #[must_use]
    pub fn issue_title(&self) -> String {
        match self.max_severity() {
            Some(severity) => format!("Configuration drift detected ({severity} severity)"),
            None => "Configuration drift detected".to_string(),
        }
    }

    /// Body for a tracking issue about this report.
    #[must_use]
    pub fn issue_body(&self, dedupe_key: &str) -> String {
        let mut body = String::new();
        body.push_str("The following compliance violations were detected:\n\n");
        for violation in self.violations() {
            body.push_str(&format!("- {violation}\n"));
        }
        if !self.discoveries.is_empty() {
            body.push_str("\nSuggested additional protections:\n\n");
            for discovery in &self.discoveries {
                body.push_str(&format!("- `{}`: {}\n", discovery.file, discovery.suggestion));
            }
        }
        body.push_str(&format!("\n<!-- drift-toolkit: {dedupe_key} -->\n"));
        body
    }
}
