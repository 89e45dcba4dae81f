//! Repository metadata reading and scannability gating.
//!
//! A repository declares its own metadata in `repo-metadata.yaml` (or `.yml`)
//! and opts into scanning by carrying a `check.toml` manifest. The reader
//! distinguishes an absent metadata file (no warning) from an empty or
//! malformed one (warning-grade, never fatal); callers decide whether
//! warnings become user-visible failures.

use crate::config::SchemaConfig;
use serde_yaml::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Metadata file names probed in order.
const METADATA_FILES: [&str; 2] = ["repo-metadata.yaml", "repo-metadata.yml"];

/// The check manifest whose presence makes a repository scannable.
pub const CHECK_MANIFEST: &str = "check.toml";

/// Parsed repository self-declared metadata.
#[derive(Debug, Clone, Default)]
pub struct RepoMetadata {
    /// Configured classification label gating which scans apply.
    pub tier: Option<String>,

    /// Lifecycle status label.
    pub status: Option<String>,

    /// Owning team.
    pub team: Option<String>,

    /// The full parsed document, unknown keys included.
    pub raw: serde_yaml::Mapping,
}

/// Warning-grade conditions raised while reading metadata.
///
/// These never block other checks; they only prevent a repository from
/// silently reporting "all checks passed".
#[derive(Debug, Clone, Error)]
pub enum MetadataWarning {
    /// Metadata file exists but contains no document.
    #[error("empty metadata file: {path}")]
    Empty { path: String },

    /// Metadata file exists but is not valid YAML (or not a mapping).
    #[error("metadata parse error in '{path}': {detail}")]
    ParseError { path: String, detail: String },

    /// Declared tier is not in the configured schema.
    #[error("unknown tier '{value}' (expected one of: {expected})")]
    UnknownTier { value: String, expected: String },

    /// Declared status is not in the configured schema.
    #[error("unknown status '{value}' (expected one of: {expected})")]
    UnknownStatus { value: String, expected: String },
}

/// Outcome of reading a repository's metadata file.
#[derive(Debug, Clone, Default)]
pub struct MetadataReadout {
    /// Parsed metadata, `None` when the file is absent, empty, or malformed.
    pub metadata: Option<RepoMetadata>,

    /// Warning-grade conditions encountered while reading.
    pub warnings: Vec<MetadataWarning>,
}

/// Whether a repository carries the artifacts required for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scannability {
    /// `has_metadata && has_check_manifest`.
    pub scannable: bool,

    /// A metadata file is present.
    pub has_metadata: bool,

    /// The check manifest is present.
    pub has_check_manifest: bool,
}

impl Scannability {
    /// Human-readable reason a repository is not scannable.
    #[must_use]
    pub fn skip_reason(&self) -> Option<String> {
        match (self.has_metadata, self.has_check_manifest) {
            (true, true) => None,
            (false, true) => Some("missing repo-metadata.yaml".to_string()),
            (true, false) => Some(format!("missing {CHECK_MANIFEST}")),
            (false, false) => Some(format!("missing repo-metadata.yaml and {CHECK_MANIFEST}")),
        }
    }
}

/// Reads a repository's self-declared metadata.
///
/// Probes `repo-metadata.yaml` then `repo-metadata.yml`. An absent file
/// yields `metadata: None` with no warning; a present-but-empty or malformed
/// file yields `metadata: None` plus a [`MetadataWarning`].
#[must_use]
pub fn read_metadata(repo_path: &Path) -> MetadataReadout {
    let Some(path) = find_metadata_file(repo_path) else {
        debug!(repo = %repo_path.display(), "No metadata file");
        return MetadataReadout::default();
    };

    let path_str = path.display().to_string();
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            return MetadataReadout {
                metadata: None,
                warnings: vec![MetadataWarning::ParseError {
                    path: path_str,
                    detail: e.to_string(),
                }],
            };
        }
    };

    if contents.trim().is_empty() {
        return MetadataReadout {
            metadata: None,
            warnings: vec![MetadataWarning::Empty { path: path_str }],
        };
    }

    let value: Value = match serde_yaml::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            return MetadataReadout {
                metadata: None,
                warnings: vec![MetadataWarning::ParseError {
                    path: path_str,
                    detail: e.to_string(),
                }],
            };
        }
    };

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => {
            return MetadataReadout {
                metadata: None,
                warnings: vec![MetadataWarning::Empty { path: path_str }],
            };
        }
        other => {
            return MetadataReadout {
                metadata: None,
                warnings: vec![MetadataWarning::ParseError {
                    path: path_str,
                    detail: format!("expected a mapping, got {}", yaml_kind(&other)),
                }],
            };
        }
    };

    MetadataReadout {
        metadata: Some(RepoMetadata {
            tier: string_field(&mapping, "tier"),
            status: string_field(&mapping, "status"),
            team: string_field(&mapping, "team"),
            raw: mapping,
        }),
        warnings: Vec::new(),
    }
}

/// Validates metadata labels against the configured schema.
///
/// Violations are warning-grade: they never block other checks.
#[must_use]
pub fn validate_metadata(metadata: &RepoMetadata, schema: &SchemaConfig) -> Vec<MetadataWarning> {
    let mut warnings = Vec::new();

    if let Some(tier) = &metadata.tier {
        if !schema.tiers.is_empty() && !schema.tiers.contains(tier) {
            warnings.push(MetadataWarning::UnknownTier {
                value: tier.clone(),
                expected: schema.tiers.join(", "),
            });
        }
    }

    if let Some(status) = &metadata.status {
        if !schema.statuses.is_empty() && !schema.statuses.contains(status) {
            warnings.push(MetadataWarning::UnknownStatus {
                value: status.clone(),
                expected: schema.statuses.join(", "),
            });
        }
    }

    warnings
}

/// Determines whether a repository carries both scanning prerequisites.
///
/// The gate is advisory: callers decide whether to skip or report.
#[must_use]
pub fn is_scannable(repo_path: &Path) -> Scannability {
    let has_metadata = find_metadata_file(repo_path).is_some();
    let has_check_manifest = repo_path.join(CHECK_MANIFEST).is_file();
    Scannability {
        scannable: has_metadata && has_check_manifest,
        has_metadata,
        has_check_manifest,
    }
}

fn find_metadata_file(repo_path: &Path) -> Option<std::path::PathBuf> {
    METADATA_FILES
        .iter()
        .map(|name| repo_path.join(name))
        .find(|path| path.is_file())
}

fn string_field(mapping: &serde_yaml::Mapping, key: &str) -> Option<String> {
    mapping
        .get(Value::String(key.to_string()))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
