//! Conditional scan execution against a repository working directory.
//!
//! Each [`ScanDefinition`] passes through an ordered set of gates before its
//! command runs: tier filter, then `if_file`, then `if_command`. A scan
//! skipped by any gate never executes its command. The primary command runs
//! under a hard deadline; exceeding it terminates the whole subprocess
//! tree and the scan fails with a synthetic exit code.

mod result;

pub use result::{ScanContext, ScanResult, ScanStatus};

use crate::config::ScanDefinition;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, info_span, warn, Instrument};

/// Deadline applied when a definition does not set `timeout`.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Synthetic exit code reported for timeouts and spawn failures.
const SYNTHETIC_FAILURE_CODE: i32 = -1;

/// Runs one scan definition against a repository working directory.
///
/// Gate order is fixed: (1) tier filter, (2) `if_file` existence,
/// (3) `if_command` exit status. Only when all gates pass does the primary
/// command execute, in `repo_path`, under the definition's deadline. The
/// result always carries captured stdout/stderr and the definition's
/// severity.
pub async fn run_scan(scan: &ScanDefinition, repo_path: &Path, context: &ScanContext) -> ScanResult {
    let span = info_span!("run_scan", scan = %scan.name);

    async {
        if let Some(tiers) = &scan.tiers {
            let tier_matches = context
                .tier
                .as_ref()
                .is_some_and(|tier| tiers.contains(tier));
            if !tier_matches {
                debug!(required = ?tiers, tier = ?context.tier, "Tier gate not satisfied");
                return ScanResult::skipped(
                    &scan.name,
                    scan.severity,
                    format!("tier not in [{}]", tiers.join(", ")),
                );
            }
        }

        if let Some(if_file) = &scan.if_file {
            if !repo_path.join(if_file).exists() {
                debug!(if_file = %if_file, "Gate file absent");
                return ScanResult::skipped(
                    &scan.name,
                    scan.severity,
                    format!("gate file absent: {if_file}"),
                );
            }
        }

        let deadline = Duration::from_millis(scan.timeout.unwrap_or(DEFAULT_TIMEOUT_MS));

        if let Some(if_command) = &scan.if_command {
            let probe = run_command(if_command, repo_path, deadline).await;
            if probe.exit_code != 0 {
                debug!(if_command = %if_command, code = probe.exit_code, "Gate command nonzero");
                return ScanResult::skipped(
                    &scan.name,
                    scan.severity,
                    format!("gate command exited {}: {if_command}", probe.exit_code),
                );
            }
        }

        let capture = run_command(&scan.command, repo_path, deadline).await;

        let status = if capture.timed_out {
            warn!(timeout_ms = deadline.as_millis() as u64, "Scan timed out");
            ScanStatus::Fail
        } else if capture.exit_code == 0 {
            ScanStatus::Pass
        } else {
            ScanStatus::Fail
        };

        let mut stderr = capture.stderr;
        if capture.timed_out {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "scan timed out after {}ms",
                deadline.as_millis()
            ));
        }

        info!(status = status.as_str(), code = capture.exit_code, "Scan finished");
        ScanResult {
            scan: scan.name.clone(),
            status,
            exit_code: Some(capture.exit_code),
            stdout: capture.stdout,
            stderr,
            severity: scan.severity,
        }
    }
    .instrument(span)
    .await
}

/// Runs all scan definitions in input order with a shared context.
pub async fn run_all_scans(
    scans: &[ScanDefinition],
    repo_path: &Path,
    context: &ScanContext,
) -> Vec<ScanResult> {
    let mut results = Vec::with_capacity(scans.len());
    for scan in scans {
        results.push(run_scan(scan, repo_path, context).await);
    }
    results
}

/// Captured outcome of one shell command.
struct CommandCapture {
    exit_code: i32,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// Runs a shell command with piped streams under a deadline.
///
/// The shell leads its own process group so expiry can terminate the whole
/// command tree, not just the shell. On expiry the group is signalled and
/// the child reaped before returning; both streams are drained on every
/// exit path. Spawn failures are reported as a synthetic nonzero exit with
/// the error on stderr.
async fn run_command(command: &str, dir: &Path, deadline: Duration) -> CommandCapture {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandCapture {
                exit_code: SYNTHETIC_FAILURE_CODE,
                stdout: String::new(),
                stderr: format!("failed to spawn command: {e}"),
                timed_out: false,
            };
        }
    };

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(drain_pipe(stdout_pipe));
    let stderr_task = tokio::spawn(drain_pipe(stderr_pipe));

    let (exit_code, timed_out) = match tokio::time::timeout(deadline, child.wait()).await {
        Ok(Ok(status)) => (status.code().unwrap_or(SYNTHETIC_FAILURE_CODE), false),
        Ok(Err(_)) => (SYNTHETIC_FAILURE_CODE, false),
        Err(_) => {
            // Deadline expired: kill the whole group and reap so nothing
            // runs on in the background holding the pipes open.
            kill_process_tree(&mut child).await;
            (SYNTHETIC_FAILURE_CODE, true)
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    CommandCapture {
        exit_code,
        stdout,
        stderr,
        timed_out,
    }
}

/// Signals the child's process group, then reaps the child.
async fn kill_process_tree(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The shell leads the group (process_group(0) at spawn), so a
        // negative-pid kill reaches its descendants too.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

async fn drain_pipe<R>(pipe: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).to_string()
}
