//! Scan result types.

use crate::config::Severity;
use serde::Serialize;

/// Outcome of one configured scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    /// Command executed and exited zero.
    Pass,

    /// Command executed and exited nonzero, or timed out.
    Fail,

    /// A gating predicate was not satisfied; the command never ran.
    Skip {
        /// Which gate caused the skip.
        reason: String,
    },
}

impl ScanStatus {
    /// Returns the status as a string for report rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip { .. } => "skip",
        }
    }
}

/// Result of running one scan against a repository.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Name of the scan definition.
    pub scan: String,

    /// Outcome of the scan.
    pub status: ScanStatus,

    /// Exit code of the primary command, `None` when skipped. A timeout
    /// yields a synthetic `-1`.
    pub exit_code: Option<i32>,

    /// Captured standard output of the primary command.
    pub stdout: String,

    /// Captured standard error of the primary command.
    pub stderr: String,

    /// Severity copied from the scan definition.
    pub severity: Severity,
}

impl ScanResult {
    pub(crate) fn skipped(name: &str, severity: Severity, reason: String) -> Self {
        Self {
            scan: name.to_string(),
            status: ScanStatus::Skip { reason },
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            severity,
        }
    }
}

/// Per-repository context applied to every scan in a run.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    /// Tier declared in the repository's metadata, if any.
    pub tier: Option<String>,
}
