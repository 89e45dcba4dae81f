//! CLI for the drift toolkit.
//!
//! Detects configuration drift against an approved baseline in a single
//! repository or across a whole organization, and optionally remediates it.

use clap::{Parser, Subcommand};
use drift_toolkit::{
    detect_dependency_changes, fix, load_config, scan_repository, DetectOptions, FixAction,
    FixOptions, FixPlan, GitHubHost, OrgScanOptions, OrgScanSummary, OrgScanner, RepoReport,
    SystemGit, APPROVED_DIR, CONFIG_FILE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Drift Toolkit - Detect and remediate configuration drift across repositories.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a single repository working directory.
    Scan {
        /// Path to the repository to scan.
        #[arg(long, default_value = ".")]
        repo_path: PathBuf,

        /// Directory holding drift.config.yaml and approved/.
        #[arg(long)]
        config_dir: PathBuf,

        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Scan every eligible repository of an organization.
    ScanOrg {
        /// Organization to scan.
        org: String,

        /// GitHub Personal Access Token.
        #[arg(long, env = "GITHUB_TOKEN")]
        token: String,

        /// Config repository name override.
        #[arg(long)]
        config_repo: Option<String>,

        /// Scan all repositories, ignoring the recent-activity window.
        #[arg(long)]
        all: bool,

        /// Recent-activity window in hours.
        #[arg(long)]
        since_hours: Option<u64>,

        /// Restrict the run to a single repository.
        #[arg(long)]
        repo: Option<String>,

        /// Additional repository name patterns to exclude.
        #[arg(long)]
        exclude: Vec<String>,

        /// Maximum concurrent repository scans.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Report without creating issues.
        #[arg(long)]
        dry_run: bool,
    },

    /// Restore drifted or missing protected files from the baseline.
    Fix {
        /// Path to the repository to fix.
        #[arg(long, default_value = ".")]
        repo_path: PathBuf,

        /// Directory holding drift.config.yaml and approved/.
        #[arg(long)]
        config_dir: PathBuf,

        /// Compute and report the plan without writing.
        #[arg(long)]
        dry_run: bool,

        /// Restrict the fix to these files (repeatable).
        #[arg(long)]
        file: Vec<String>,

        /// Emit the plan as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Classify tracked dependency-file changes between two commits.
    Deps {
        /// Path to the repository.
        #[arg(long, default_value = ".")]
        repo_path: PathBuf,

        /// Directory holding drift.config.yaml and approved/.
        #[arg(long)]
        config_dir: PathBuf,

        /// Older end of the commit range.
        #[arg(long)]
        base: String,

        /// Newer end of the commit range.
        #[arg(long, default_value = "HEAD")]
        target: String,

        /// Emit the detection as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    init_tracing();

    // Parse arguments
    let args = Args::parse();

    // Run the main logic
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Tracing is Rust's structured logging/diagnostics framework. Unlike traditional
/// logging, it's async-aware and captures contextual, structured data rather than
/// just text. The subscriber configured here determines how events (from macros
/// like `info!`, `debug!`, etc.) are collected and displayed.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        // Use compact formatting without module target paths for cleaner output
        .with(fmt::layer().compact().with_target(false))
        // Allow runtime log filtering via RUST_LOG env var (e.g., RUST_LOG=debug)
        // Falls back to "info" level if RUST_LOG is not set or invalid
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // Register as the global default subscriber
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match args.command {
        Command::Scan {
            repo_path,
            config_dir,
            json,
        } => {
            let config = load_config(&config_dir.join(CONFIG_FILE))?;
            let approved_base = config_dir.join(APPROVED_DIR);
            let repository = repo_path.display().to_string();
            let report = scan_repository(&config, &repository, &repo_path, &approved_base).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(exit_for(report.is_clean()))
        }

        Command::ScanOrg {
            org,
            token,
            config_repo,
            all,
            since_hours,
            repo,
            exclude,
            concurrency,
            dry_run,
        } => {
            let host = GitHubHost::new(token)?;
            let scanner = OrgScanner::new(Arc::new(host), Arc::new(SystemGit));
            let options = OrgScanOptions {
                config_repo,
                all,
                since_hours,
                repo_filter: repo,
                exclude,
                concurrency,
                dry_run,
            };
            let summary = scanner.scan_org(&org, &options).await?;

            print_summary(&summary);
            Ok(exit_for(!summary.has_failures()))
        }

        Command::Fix {
            repo_path,
            config_dir,
            dry_run,
            file,
            json,
        } => {
            let config = load_config(&config_dir.join(CONFIG_FILE))?;
            let approved_base = config_dir.join(APPROVED_DIR);
            let options = FixOptions {
                dry_run,
                file_filter: (!file.is_empty()).then_some(file),
            };
            let plan = fix(
                &config.integrity.protected,
                &repo_path,
                &approved_base,
                &options,
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
            Ok(exit_for(!plan.has_unresolvable()))
        }

        Command::Deps {
            repo_path,
            config_dir,
            base,
            target,
            json,
        } => {
            let config = load_config(&config_dir.join(CONFIG_FILE))?;
            let options = DetectOptions {
                base_commit: base,
                target_commit: target,
            };
            let detection = detect_dependency_changes(
                &SystemGit,
                &config.dependencies.tracked,
                &repo_path,
                &options,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&detection)?);
            } else {
                println!("\nTracked files at target: {}", detection.total_tracked_files);
                if detection.has_changes {
                    for (check_type, changes) in &detection.by_check {
                        println!("  {check_type}:");
                        for change in changes {
                            println!("    {} {}", change.status.as_str(), change.file);
                        }
                    }
                } else {
                    println!("  No tracked changes");
                }
            }
            Ok(ExitCode::from(0))
        }
    }
}

/// Maps a pass/fail outcome to the process exit code.
fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}

/// Prints a single-repository report.
fn print_report(report: &RepoReport) {
    println!("\nReport for {}:", report.repository);

    let violations = report.violations();
    if violations.is_empty() {
        println!("  All checks passed");
    } else {
        for violation in &violations {
            println!("  {violation}");
        }
    }

    if !report.discoveries.is_empty() {
        println!("\n  Suggestions:");
        for discovery in &report.discoveries {
            println!("    {}: {}", discovery.file, discovery.suggestion);
        }
    }
}

/// Prints a fix plan.
fn print_plan(plan: &FixPlan) {
    println!(
        "\n{} {} action(s):",
        if plan.dry_run { "Planned" } else { "Applied" },
        plan.actions.len()
    );
    for action in &plan.actions {
        match action {
            FixAction::Overwrite { file } => println!("  overwrite {file}"),
            FixAction::Create { file } => println!("  create    {file}"),
            FixAction::Unresolvable { file, reason } => {
                println!("  unresolvable {file}: {reason}");
            }
        }
    }
}

/// Prints the final org scan summary.
fn print_summary(summary: &OrgScanSummary) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Config repo: {}/{}", summary.org, summary.config_repo);
    println!("  Candidates: {}", summary.total_repos);
    println!("  Excluded: {}", summary.excluded_repos);
    println!("  Inactive: {}", summary.inactive_repos);
    println!("  Scanned: {}", summary.scanned_repos);
    println!("  Skipped: {}", summary.skipped_repos);
    println!("  Passed: {}", summary.passed_repos);
    println!("  Failed: {}", summary.failed_repos);

    if !summary.dry_run {
        println!("  Issues created: {}", summary.issues_created);
    }
}
