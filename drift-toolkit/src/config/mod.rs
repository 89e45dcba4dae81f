//! Drift configuration loading.
//!
//! This module parses `drift.config.yaml` from a config repository and
//! validates it into the typed structures the rest of the engine consumes.

mod error;
mod types;

pub use error::ConfigError;
pub use types::{DiscoveryPattern, IntegrityCheck, ScanDefinition, Severity, TrackedPattern};

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default file name of the drift configuration inside a config repository.
pub const CONFIG_FILE: &str = "drift.config.yaml";

/// Default directory of approved baseline content inside a config repository.
pub const APPROVED_DIR: &str = "approved";

/// Default name of the org-level config repository.
pub const DEFAULT_CONFIG_REPO: &str = "drift-config";

/// Schema section: the vocabulary repository metadata is validated against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Valid tier labels (e.g., "production", "internal").
    #[serde(default)]
    pub tiers: Vec<String>,

    /// Valid status labels (e.g., "active", "archived").
    #[serde(default)]
    pub statuses: Vec<String>,
}

/// Integrity section: protected files and discovery suggestions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrityConfig {
    /// Files compared against the approved baseline.
    #[serde(default)]
    pub protected: Vec<IntegrityCheck>,

    /// Patterns suggesting additional files to protect.
    #[serde(default)]
    pub discover: Vec<DiscoveryPattern>,
}

/// Dependency section: which changed files count as tracked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependencyConfig {
    /// Patterns assigning changed files to check-type buckets.
    #[serde(default)]
    pub tracked: Vec<TrackedPattern>,
}

/// Org section: fan-out defaults for organization scans.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgConfig {
    /// Name of the config repository within the organization.
    #[serde(default = "default_config_repo")]
    pub config_repo: String,

    /// Maximum concurrent repository scans.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Recent-activity window for smart scanning, in hours.
    #[serde(default = "default_since_hours")]
    pub since_hours: u64,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            config_repo: default_config_repo(),
            concurrency: default_concurrency(),
            since_hours: default_since_hours(),
        }
    }
}

fn default_config_repo() -> String {
    DEFAULT_CONFIG_REPO.to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_since_hours() -> u64 {
    24
}

/// The full drift configuration supplied by a config repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriftConfig {
    /// Metadata validation vocabulary.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Protected files and discovery patterns.
    #[serde(default)]
    pub integrity: IntegrityConfig,

    /// Shell checks executed per repository.
    #[serde(default)]
    pub scans: Vec<ScanDefinition>,

    /// Tracked dependency-file classification.
    #[serde(default)]
    pub dependencies: DependencyConfig,

    /// Repository name patterns excluded from org scans.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Org scan defaults.
    #[serde(default)]
    pub org: OrgConfig,
}

/// Loads and validates the drift configuration from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigNotFound`] if the file does not exist,
/// [`ConfigError::ParseError`] for malformed YAML, and
/// [`ConfigError::ValidationError`] when scan definitions reference tiers
/// absent from `schema.tiers` or carry duplicate names.
pub fn load_config(path: &Path) -> Result<DriftConfig, ConfigError> {
    debug!(path = %path.display(), "Loading drift configuration");

    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: DriftConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_config(&config, path)?;

    info!(
        protected = config.integrity.protected.len(),
        scans = config.scans.len(),
        "Loaded drift configuration"
    );
    Ok(config)
}

/// Validates cross-references within the configuration.
fn validate_config(config: &DriftConfig, path: &Path) -> Result<(), ConfigError> {
    let path_str = path.display().to_string();

    let mut seen = std::collections::HashSet::new();
    for scan in &config.scans {
        if scan.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                path: path_str,
                message: "scan name must not be empty".to_string(),
            });
        }
        if !seen.insert(scan.name.as_str()) {
            return Err(ConfigError::ValidationError {
                path: path_str,
                message: format!("duplicate scan name: {}", scan.name),
            });
        }
        if scan.command.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                path: path_str,
                message: format!("scan '{}' has an empty command", scan.name),
            });
        }
        if let Some(tiers) = &scan.tiers {
            for tier in tiers {
                if !config.schema.tiers.is_empty() && !config.schema.tiers.contains(tier) {
                    return Err(ConfigError::ValidationError {
                        path: path_str,
                        message: format!("scan '{}' references unknown tier '{tier}'", scan.name),
                    });
                }
            }
        }
    }

    for check in &config.integrity.protected {
        if check.file.trim().is_empty() || check.approved.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                path: path_str,
                message: "protected entries require both 'file' and 'approved'".to_string(),
            });
        }
    }

    Ok(())
}
