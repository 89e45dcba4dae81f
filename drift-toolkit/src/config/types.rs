//! Configuration deserialization types.

use serde::{Deserialize, Serialize};

/// Severity assigned to an integrity check or scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Returns the severity as a string for report rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protected file under integrity checking.
///
/// The live `file` (relative to the repository root) is compared byte-for-byte
/// against `approved` (relative to the approved baseline directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityCheck {
    /// Repository-relative path of the protected file.
    pub file: String,

    /// Baseline-relative path of the approved content.
    pub approved: String,

    /// Severity reported when the file drifts or is missing.
    pub severity: Severity,
}

/// A glob pattern suggesting files that could be placed under protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPattern {
    /// Glob matched against repository-relative paths.
    pub pattern: String,

    /// Human-readable suggestion attached to each match.
    pub suggestion: String,
}

/// A configured shell check executed against a repository working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefinition {
    /// Unique scan name.
    pub name: String,

    /// Shell command executed when all gates pass.
    pub command: String,

    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Gate: skip unless this repository-relative file exists.
    #[serde(default)]
    pub if_file: Option<String>,

    /// Gate: skip unless this shell command exits zero.
    #[serde(default)]
    pub if_command: Option<String>,

    /// Deadline for the command in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Gate: skip unless the repository tier is in this set.
    #[serde(default)]
    pub tiers: Option<Vec<String>>,

    /// Severity reported when the scan fails.
    #[serde(default = "default_scan_severity")]
    pub severity: Severity,
}

pub(crate) fn default_scan_severity() -> Severity {
    Severity::Medium
}

/// A glob pattern classifying changed dependency files by check type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPattern {
    /// Glob matched against changed repository-relative paths.
    pub pattern: String,

    /// Check-type bucket assigned to matching files (e.g., "lint").
    pub check_type: String,
}
