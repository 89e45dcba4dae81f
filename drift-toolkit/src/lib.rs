#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod deps;
pub mod discovery;
pub mod fix;
pub mod git;
pub mod host;
pub mod integrity;
pub mod metadata;
pub mod orgscan;
pub mod report;
pub mod runner;
pub mod scan;

pub use config::{
    load_config, ConfigError, DriftConfig, IntegrityCheck, ScanDefinition, Severity,
    APPROVED_DIR, CONFIG_FILE, DEFAULT_CONFIG_REPO,
};
pub use deps::{
    detect_dependency_changes, DependencyChange, DependencyChangesDetection, DepsError,
    DetectOptions,
};
pub use discovery::{discover, DiscoveryError, DiscoveryResult};
pub use fix::{fix, FixAction, FixError, FixOptions, FixPlan};
pub use git::{ChangeStatus, GitClient, GitError, SystemGit, TreeChange};
pub use host::{GitHubHost, HostClient, HostError, IssueOutcome};
pub use integrity::{check_all, check_one, IntegrityError, IntegrityResult, IntegrityStatus};
pub use metadata::{
    is_scannable, read_metadata, validate_metadata, MetadataReadout, MetadataWarning,
    RepoMetadata, Scannability, CHECK_MANIFEST,
};
pub use orgscan::{OrgScanError, OrgScanOptions, OrgScanSummary, OrgScanner, RepoScanResult};
pub use report::{RepoReport, Violation};
pub use runner::scan_repository;
pub use scan::{run_all_scans, run_scan, ScanContext, ScanResult, ScanStatus};
