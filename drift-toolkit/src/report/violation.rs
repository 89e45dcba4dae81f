//! The closed set of violation kinds a report can carry.

use crate::config::Severity;
use serde::Serialize;

/// One condition requiring attention in a repository.
///
/// The set is closed so report assembly and rendering stay exhaustive:
/// adding a kind forces every consumer to handle it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A protected file's live content differs from its approved baseline.
    Drift { file: String, severity: Severity },

    /// A protected file is absent from the repository.
    MissingProtected { file: String, severity: Severity },

    /// A configured scan executed and failed.
    FailedScan { name: String, severity: Severity },

    /// A check could not run (permission denied, missing baseline, bad
    /// pattern).
    CheckError { detail: String },

    /// The repository lacks a scanning prerequisite.
    NotScannable { reason: String },

    /// Warning-grade metadata condition (empty, malformed, unknown labels).
    MetadataWarning { detail: String },
}

impl Violation {
    /// Severity, when the violation kind carries one.
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Drift { severity, .. }
            | Self::MissingProtected { severity, .. }
            | Self::FailedScan { severity, .. } => Some(*severity),
            Self::CheckError { .. }
            | Self::NotScannable { .. }
            | Self::MetadataWarning { .. } => None,
        }
    }

    /// Stable key used in violation signatures.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Drift { file, .. } => format!("drift:{file}"),
            Self::MissingProtected { file, .. } => format!("missing:{file}"),
            Self::FailedScan { name, .. } => format!("scan:{name}"),
            Self::CheckError { detail } => format!("error:{detail}"),
            Self::NotScannable { reason } => format!("not-scannable:{reason}"),
            Self::MetadataWarning { detail } => format!("metadata:{detail}"),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drift { file, severity } => {
                write!(f, "[{severity}] `{file}` has drifted from its approved baseline")
            }
            Self::MissingProtected { file, severity } => {
                write!(f, "[{severity}] protected file `{file}` is missing")
            }
            Self::FailedScan { name, severity } => {
                write!(f, "[{severity}] scan `{name}` failed")
            }
            Self::CheckError { detail } => {
                write!(f, "check error: {detail}")
            }
            Self::NotScannable { reason } => {
                write!(f, "repository is not scannable: {reason}")
            }
            Self::MetadataWarning { detail } => {
                write!(f, "metadata warning: {detail}")
            }
        }
    }
}
