//! Organization-wide fan-out scanning.
//!
//! Resolves a config repository, pre-filters candidate repositories using
//! only hosting-API metadata, then fans the per-repo check sequence out
//! across a bounded worker pool. Worker results are folded into the summary
//! by the single collecting task; no worker observes another's partial
//! state.

mod error;
mod summary;

pub use error::OrgScanError;
pub use summary::{OrgScanSummary, RepoScanResult};

use crate::config::{load_config, DriftConfig, APPROVED_DIR, CONFIG_FILE, DEFAULT_CONFIG_REPO};
use crate::git::GitClient;
use crate::host::{HostClient, HostError, IssueOutcome};
use crate::metadata::is_scannable;
use crate::runner::scan_repository;
use futures::stream::{self, StreamExt};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Options for one organization scan.
#[derive(Debug, Clone, Default)]
pub struct OrgScanOptions {
    /// Config repository name; defaults to the fixed configured name.
    pub config_repo: Option<String>,

    /// Scan every candidate, ignoring the recent-activity window.
    pub all: bool,

    /// Recent-activity window override, in hours.
    pub since_hours: Option<u64>,

    /// Restrict the run to this single repository.
    pub repo_filter: Option<String>,

    /// Additional exclude patterns, merged with the configured ones.
    pub exclude: Vec<String>,

    /// Worker pool size override.
    pub concurrency: Option<usize>,

    /// Disable remediation and issue-creation side effects.
    pub dry_run: bool,
}

/// Scans every eligible repository of an organization.
pub struct OrgScanner {
    host: Arc<dyn HostClient>,
    git: Arc<dyn GitClient>,
}

impl OrgScanner {
    /// Builds a scanner over a host and git boundary.
    pub fn new(host: Arc<dyn HostClient>, git: Arc<dyn GitClient>) -> Self {
        Self { host, git }
    }

    /// Executes a full organization scan.
    ///
    /// # Errors
    ///
    /// Returns [`OrgScanError::ConfigRepoNotFound`] when the config
    /// repository cannot be resolved (fatal: no repository is scanned), and
    /// [`OrgScanError::RepoNotFound`] when an explicitly named repository
    /// does not exist. Per-repository failures are recorded in the summary,
    /// never raised.
    pub async fn scan_org(
        &self,
        org: &str,
        options: &OrgScanOptions,
    ) -> Result<OrgScanSummary, OrgScanError> {
        let span = info_span!("scan_org", org = %org);
        self.scan_org_inner(org, options).instrument(span).await
    }

    async fn scan_org_inner(
        &self,
        org: &str,
        options: &OrgScanOptions,
    ) -> Result<OrgScanSummary, OrgScanError> {
        let config_repo = options
            .config_repo
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_REPO.to_string());

        if !self.host.repo_exists(org, &config_repo).await? {
            return Err(OrgScanError::ConfigRepoNotFound {
                org: org.to_string(),
                config_repo,
            });
        }

        let config_dir = tempfile::tempdir().map_err(|e| OrgScanError::WorkDir { source: e })?;
        self.git
            .clone_repo(&self.host.clone_url(org, &config_repo), config_dir.path())
            .await?;
        let config = Arc::new(load_config(&config_dir.path().join(CONFIG_FILE))?);
        let approved_base = config_dir.path().join(APPROVED_DIR);

        let mut summary = OrgScanSummary::new(org, &config_repo, options.dry_run);

        let candidates = self
            .enumerate_candidates(org, &config_repo, options)
            .await?;
        summary.total_repos = candidates.len();
        info!(candidates = candidates.len(), "Enumerated candidate repositories");

        let excludes = build_exclude_set(&config, options)?;
        let (candidates, excluded) = apply_excludes(candidates, &excludes);
        summary.excluded_repos = excluded;

        let (candidates, inactive) = self.apply_activity_window(org, candidates, &config, options).await;
        summary.inactive_repos = inactive;

        let concurrency = options.concurrency.unwrap_or(config.org.concurrency).max(1);
        info!(
            repos = candidates.len(),
            concurrency, "Starting repository fan-out"
        );

        let results: Vec<RepoScanResult> = stream::iter(candidates)
            .map(|name| {
                let host = Arc::clone(&self.host);
                let git = Arc::clone(&self.git);
                let config = Arc::clone(&config);
                let approved_base = approved_base.clone();
                let org = org.to_string();
                let dry_run = options.dry_run;

                async move {
                    process_repository(host, git, config, &approved_base, &org, &name, dry_run)
                        .await
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for result in &results {
            summary.record_result(result);
        }

        info!(
            scanned = summary.scanned_repos,
            skipped = summary.skipped_repos,
            failed = summary.failed_repos,
            "Organization scan complete"
        );
        Ok(summary)
    }

    /// Enumerates candidates, honoring a single-repository filter.
    async fn enumerate_candidates(
        &self,
        org: &str,
        config_repo: &str,
        options: &OrgScanOptions,
    ) -> Result<Vec<String>, OrgScanError> {
        if let Some(repo) = &options.repo_filter {
            if !self.host.repo_exists(org, repo).await? {
                return Err(OrgScanError::RepoNotFound {
                    org: org.to_string(),
                    repo: repo.clone(),
                });
            }
            return Ok(vec![repo.clone()]);
        }

        let mut names = self.host.list_repos(org).await?;
        names.retain(|name| name != config_repo);
        Ok(names)
    }

    /// Drops repositories without a commit inside the window ("smart
    /// scanning"). A host failure keeps the candidate: the worker will
    /// surface it as that repository's failure.
    async fn apply_activity_window(
        &self,
        org: &str,
        candidates: Vec<String>,
        config: &DriftConfig,
        options: &OrgScanOptions,
    ) -> (Vec<String>, usize) {
        if options.all {
            return (candidates, 0);
        }
        let since_hours = options.since_hours.unwrap_or(config.org.since_hours);

        let mut kept = Vec::new();
        let mut inactive = 0;
        for name in candidates {
            match self.host.recent_commit(org, &name, since_hours).await {
                Ok(true) => kept.push(name),
                Ok(false) => inactive += 1,
                Err(e) => {
                    warn!(repo = %name, error = %e, "Activity probe failed, keeping candidate");
                    kept.push(name);
                }
            }
        }
        (kept, inactive)
    }
}

/// Clones and scans one repository, creating a tracking issue on failure.
async fn process_repository(
    host: Arc<dyn HostClient>,
    git: Arc<dyn GitClient>,
    config: Arc<DriftConfig>,
    approved_base: &Path,
    org: &str,
    name: &str,
    dry_run: bool,
) -> RepoScanResult {
    let full_name = format!("{org}/{name}");
    let span = info_span!("process_repository", repo = %full_name);

    async {
        info!("Processing repository");

        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return RepoScanResult::Failed {
                    repository: full_name.clone(),
                    error: format!("failed to create working directory: {e}"),
                };
            }
        };

        if let Err(e) = git.clone_repo(&host.clone_url(org, name), workdir.path()).await {
            error!(error = %e, "Clone failed");
            return RepoScanResult::Failed {
                repository: full_name.clone(),
                error: e.to_string(),
            };
        }

        // Gate before any check runs: a repository that never opted in via
        // the check manifest gets no shell commands executed against it.
        let scannability = is_scannable(workdir.path());
        if let Some(reason) = scannability.skip_reason() {
            info!(reason = %reason, "Repository skipped");
            return RepoScanResult::Skipped {
                repository: full_name.clone(),
                reason,
            };
        }

        let report = scan_repository(&config, &full_name, workdir.path(), approved_base).await;

        let mut issue = None;
        if report.has_failures() && !dry_run {
            let dedupe_key = format!("{full_name}:{}", report.violation_signature());
            match host
                .create_issue(
                    org,
                    name,
                    &report.issue_title(),
                    &report.issue_body(&dedupe_key),
                    &dedupe_key,
                )
                .await
            {
                Ok(outcome) => issue = Some(outcome),
                Err(HostError::PermissionDenied { .. }) => {
                    warn!("No write access, issue not created");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to create issue");
                }
            }
        }

        RepoScanResult::Scanned {
            repository: full_name,
            report,
            issue,
        }
    }
    .instrument(span)
    .await
}

/// Compiles configured and ad hoc exclude patterns into one set.
fn build_exclude_set(
    config: &DriftConfig,
    options: &OrgScanOptions,
) -> Result<GlobSet, OrgScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in config.exclude.iter().chain(options.exclude.iter()) {
        let glob = Glob::new(pattern).map_err(|e| OrgScanError::InvalidExclude {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| OrgScanError::InvalidExclude {
            pattern: String::new(),
            source: e,
        })
}

/// Pre-clone filtering: drops excluded names using only the repo name.
fn apply_excludes(candidates: Vec<String>, excludes: &GlobSet) -> (Vec<String>, usize) {
    let before = candidates.len();
    let kept: Vec<String> = candidates
        .into_iter()
        .filter(|name| !excludes.is_match(name))
        .collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitError;
    use crate::host::IssueOutcome;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory host whose repositories are materialized by [`FakeGit`].
    struct FakeHost {
        repos: Vec<String>,
        active: HashSet<String>,
        issues: Mutex<Vec<(String, String)>>,
    }

    impl FakeHost {
        fn new(repos: &[&str]) -> Self {
            Self {
                repos: repos.iter().map(|r| r.to_string()).collect(),
                active: repos.iter().map(|r| r.to_string()).collect(),
                issues: Mutex::new(Vec::new()),
            }
        }

        fn with_inactive(mut self, name: &str) -> Self {
            self.active.remove(name);
            self
        }

        fn with_existing_issue(self, name: &str, dedupe_key: &str) -> Self {
            self.issues
                .lock()
                .unwrap()
                .push((name.to_string(), dedupe_key.to_string()));
            self
        }

        fn issue_count(&self, name: &str) -> usize {
            self.issues
                .lock()
                .unwrap()
                .iter()
                .filter(|(repo, _)| repo == name)
                .count()
        }
    }

    #[async_trait]
    impl HostClient for FakeHost {
        async fn list_repos(&self, _org: &str) -> Result<Vec<String>, HostError> {
            Ok(self.repos.clone())
        }

        async fn repo_exists(&self, _org: &str, name: &str) -> Result<bool, HostError> {
            Ok(self.repos.iter().any(|r| r == name))
        }

        async fn recent_commit(
            &self,
            _org: &str,
            name: &str,
            _since_hours: u64,
        ) -> Result<bool, HostError> {
            Ok(self.active.contains(name))
        }

        async fn create_issue(
            &self,
            _org: &str,
            name: &str,
            _title: &str,
            _body: &str,
            dedupe_key: &str,
        ) -> Result<IssueOutcome, HostError> {
            let mut issues = self.issues.lock().unwrap();
            if issues.iter().any(|(_, key)| key == dedupe_key) {
                return Ok(IssueOutcome::Existing { number: 1 });
            }
            issues.push((name.to_string(), dedupe_key.to_string()));
            Ok(IssueOutcome::Created {
                number: issues.len() as u64,
                url: format!("https://example.com/{name}/issues/{}", issues.len()),
            })
        }

        fn clone_url(&self, org: &str, name: &str) -> String {
            format!("fake://{org}/{name}")
        }
    }

    /// "Clones" by writing a fixed file set into the destination.
    struct FakeGit {
        trees: HashMap<String, Vec<(String, String)>>,
        cloned: Mutex<Vec<String>>,
    }

    impl FakeGit {
        fn new() -> Self {
            Self {
                trees: HashMap::new(),
                cloned: Mutex::new(Vec::new()),
            }
        }

        fn with_tree(mut self, url: &str, files: &[(&str, &str)]) -> Self {
            self.trees.insert(
                url.to_string(),
                files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            );
            self
        }

        fn cloned_urls(&self) -> Vec<String> {
            self.cloned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitClient for FakeGit {
        async fn is_repo(&self, _path: &Path) -> bool {
            true
        }

        async fn resolve_commit(
            &self,
            _path: &Path,
            reference: &str,
        ) -> Result<String, GitError> {
            Ok(reference.to_string())
        }

        async fn head_commit(&self, path: &Path) -> Result<String, GitError> {
            self.resolve_commit(path, "HEAD").await
        }

        async fn diff_tree(
            &self,
            _path: &Path,
            _base: &str,
            _target: &str,
        ) -> Result<Vec<crate::git::TreeChange>, GitError> {
            Ok(Vec::new())
        }

        async fn ls_tree(&self, _path: &Path, _reference: &str) -> Result<Vec<String>, GitError> {
            Ok(Vec::new())
        }

        async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
            self.cloned.lock().unwrap().push(url.to_string());
            let Some(files) = self.trees.get(url) else {
                return Err(GitError::CommandFailed {
                    args: "clone".to_string(),
                    stderr: format!("no such remote: {url}"),
                });
            };
            for (path, contents) in files {
                let full = dest.join(path);
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(full, contents).unwrap();
            }
            Ok(())
        }
    }

    const ORG_CONFIG: &str = r#"
integrity:
  protected:
    - file: CODEOWNERS
      approved: CODEOWNERS
      severity: critical
exclude:
  - "archived-*"
"#;

    fn config_tree() -> Vec<(&'static str, &'static str)> {
        vec![
            ("drift.config.yaml", ORG_CONFIG),
            ("approved/CODEOWNERS", "* @platform\n"),
        ]
    }

    fn scannable_repo(codeowners: &'static str) -> Vec<(&'static str, &'static str)> {
        vec![
            ("repo-metadata.yaml", "tier: internal\n"),
            ("check.toml", "[checks]\n"),
            ("CODEOWNERS", codeowners),
        ]
    }

    fn scanner(host: FakeHost, git: FakeGit) -> OrgScanner {
        OrgScanner::new(Arc::new(host), Arc::new(git))
    }

    #[tokio::test]
    async fn missing_config_repo_is_fatal_and_distinct() {
        let host = FakeHost::new(&["app"]);
        let git = FakeGit::new();

        let result = scanner(host, git)
            .scan_org("acme", &OrgScanOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(OrgScanError::ConfigRepoNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn named_repo_not_found_is_distinct_from_config_repo() {
        let host = FakeHost::new(&["drift-config"]);
        let git = FakeGit::new().with_tree("fake://acme/drift-config", &config_tree());

        let options = OrgScanOptions {
            repo_filter: Some("ghost".to_string()),
            all: true,
            ..Default::default()
        };
        let result = scanner(host, git).scan_org("acme", &options).await;

        assert!(matches!(result, Err(OrgScanError::RepoNotFound { .. })));
    }

    #[tokio::test]
    async fn clean_and_failing_repos_are_counted() {
        let host = FakeHost::new(&["drift-config", "clean", "drifted"]);
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/clean", &scannable_repo("* @platform\n"))
            .with_tree("fake://acme/drifted", &scannable_repo("* @someone-else\n"));

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let summary = scanner(host, git).scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.total_repos, 2);
        assert_eq!(summary.scanned_repos, 2);
        assert_eq!(summary.passed_repos, 1);
        assert_eq!(summary.failed_repos, 1);
        assert_eq!(summary.issues_created, 1);
    }

    #[tokio::test]
    async fn non_scannable_repo_is_skipped_with_reason() {
        let host = FakeHost::new(&["drift-config", "bare"]);
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/bare", &[("README.md", "hi\n")]);

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let summary = scanner(host, git).scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.skipped_repos, 1);
        assert_eq!(summary.scanned_repos, 0);
        assert_eq!(summary.failed_repos, 0);
    }

    #[tokio::test]
    async fn non_scannable_repo_runs_no_shell_checks() {
        let markers = tempfile::tempdir().unwrap();
        let config = format!(
            "scans:\n  - name: marker\n    command: \"touch {}/$(cat tag.txt).marker\"\n",
            markers.path().display()
        );
        let host = FakeHost::new(&["drift-config", "app", "bare"]);
        let git = FakeGit::new()
            .with_tree(
                "fake://acme/drift-config",
                &[("drift.config.yaml", config.as_str())],
            )
            .with_tree(
                "fake://acme/app",
                &[
                    ("repo-metadata.yaml", "tier: internal\n"),
                    ("check.toml", "[checks]\n"),
                    ("tag.txt", "app"),
                ],
            )
            // No metadata, no check manifest: never opted in.
            .with_tree("fake://acme/bare", &[("tag.txt", "bare")]);

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let summary = scanner(host, git).scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.scanned_repos, 1);
        assert_eq!(summary.skipped_repos, 1);
        // The scannable repository's scan executed; the skipped one never
        // had a command run against it.
        assert!(markers.path().join("app.marker").exists());
        assert!(!markers.path().join("bare.marker").exists());
    }

    #[tokio::test]
    async fn exclude_patterns_filter_before_clone() {
        let host = FakeHost::new(&["drift-config", "app", "archived-old"]);
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/app", &scannable_repo("* @platform\n"));

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let git_ref = Arc::new(git);
        let scanner = OrgScanner::new(
            Arc::new(host),
            Arc::clone(&git_ref) as Arc<dyn GitClient>,
        );
        let summary = scanner.scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.excluded_repos, 1);
        assert_eq!(summary.scanned_repos, 1);
        // The excluded repository was never cloned.
        assert!(git_ref
            .cloned_urls()
            .iter()
            .all(|url| !url.contains("archived-old")));
    }

    #[tokio::test]
    async fn inactive_repos_are_dropped_unless_all() {
        let host = FakeHost::new(&["drift-config", "app", "sleepy"]).with_inactive("sleepy");
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/app", &scannable_repo("* @platform\n"))
            .with_tree("fake://acme/sleepy", &scannable_repo("* @platform\n"));

        let summary = scanner(host, git)
            .scan_org("acme", &OrgScanOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.inactive_repos, 1);
        assert_eq!(summary.scanned_repos, 1);
    }

    #[tokio::test]
    async fn clone_failure_fails_only_that_repo() {
        let host = FakeHost::new(&["drift-config", "app", "gone"]);
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/app", &scannable_repo("* @platform\n"));

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let summary = scanner(host, git).scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.failed_repos, 1);
        assert_eq!(summary.scanned_repos, 1);
        assert_eq!(summary.passed_repos, 1);
    }

    #[tokio::test]
    async fn dry_run_disables_issue_creation_but_not_scanning() {
        let host = FakeHost::new(&["drift-config", "drifted"]);
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/drifted", &scannable_repo("* @other\n"));

        let options = OrgScanOptions {
            all: true,
            dry_run: true,
            ..Default::default()
        };
        let host_ref = Arc::new(host);
        let scanner = OrgScanner::new(Arc::clone(&host_ref) as Arc<dyn HostClient>, Arc::new(git));
        let summary = scanner.scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.failed_repos, 1);
        assert_eq!(summary.issues_created, 0);
        assert_eq!(host_ref.issue_count("drifted"), 0);
    }

    #[tokio::test]
    async fn duplicate_violation_signature_creates_no_second_issue() {
        let drifted = scannable_repo("* @other\n");
        let git = FakeGit::new()
            .with_tree("fake://acme/drift-config", &config_tree())
            .with_tree("fake://acme/drifted", &drifted);

        // Pre-seed the issue with the signature the scan will compute.
        let dedupe_key = "acme/drifted:drift:CODEOWNERS";
        let host = FakeHost::new(&["drift-config", "drifted"])
            .with_existing_issue("drifted", dedupe_key);
        let host_ref = Arc::new(host);

        let options = OrgScanOptions {
            all: true,
            ..Default::default()
        };
        let scanner = OrgScanner::new(Arc::clone(&host_ref) as Arc<dyn HostClient>, Arc::new(git));
        let summary = scanner.scan_org("acme", &options).await.unwrap();

        assert_eq!(summary.failed_repos, 1);
        assert_eq!(summary.issues_created, 0);
        assert_eq!(host_ref.issue_count("drifted"), 1);
    }
}
