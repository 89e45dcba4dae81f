//! Single-repository scan pipeline.
//!
//! Runs the full per-repo check sequence: scannability gating, metadata
//! reading and validation, integrity checks, discovery, and gated scans,
//! merged into one [`RepoReport`]. Per-file and per-scan errors are captured
//! into the report and never abort sibling checks.

use crate::config::DriftConfig;
use crate::discovery::discover;
use crate::integrity::check_all;
use crate::metadata::{is_scannable, read_metadata, validate_metadata};
use crate::report::RepoReport;
use crate::scan::{run_all_scans, ScanContext};
use std::path::Path;
use tracing::{info, info_span, warn, Instrument};

/// Runs every check family against one repository working directory.
///
/// The scannability gate is advisory here: a repository missing its metadata
/// or check manifest still gets a report, with the missing artifact recorded
/// as a violation, so the outcome never reads "all checks passed".
pub async fn scan_repository(
    config: &DriftConfig,
    repository: &str,
    repo_path: &Path,
    approved_base: &Path,
) -> RepoReport {
    let span = info_span!("scan_repository", repo = %repository);

    async {
        let scannability = is_scannable(repo_path);
        let mut report = RepoReport::new(repository.to_string(), scannability);

        let readout = read_metadata(repo_path);
        for warning in &readout.warnings {
            report.metadata_warnings.push(warning.to_string());
        }
        if let Some(metadata) = &readout.metadata {
            for warning in validate_metadata(metadata, &config.schema) {
                report.metadata_warnings.push(warning.to_string());
            }
        }

        for outcome in check_all(&config.integrity.protected, repo_path, approved_base) {
            match outcome {
                Ok(result) => report.integrity.push(result),
                Err(e) => report.check_errors.push(e.to_string()),
            }
        }

        let protected: Vec<String> = config
            .integrity
            .protected
            .iter()
            .map(|check| check.file.clone())
            .collect();
        match discover(&config.integrity.discover, repo_path, &protected) {
            Ok(discoveries) => report.discoveries = discoveries,
            Err(e) => {
                warn!(error = %e, "Discovery failed");
                report.check_errors.push(e.to_string());
            }
        }

        let context = ScanContext {
            tier: readout.metadata.as_ref().and_then(|m| m.tier.clone()),
        };
        report.scans = run_all_scans(&config.scans, repo_path, &context).await;

        info!(
            violations = report.violations().len(),
            clean = report.is_clean(),
            "Repository scan complete"
        );
        report
    }
    .instrument(span)
    .await
}
