use std::fs;
use std::path::Path;
use std::process::Command;

use drift_toolkit::config::TrackedPattern;
use drift_toolkit::{detect_dependency_changes, ChangeStatus, DetectOptions, SystemGit};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.com",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn tracked() -> Vec<TrackedPattern> {
    vec![TrackedPattern {
        pattern: "*.lock".to_string(),
        check_type: "lockfile".to_string(),
    }]
}

/// Repository with two commits: the second modifies the lockfile, touches
/// an untracked file, and edits the check manifest.
fn two_commit_repo() -> TempDir {
    let repo = TempDir::new().unwrap();
    git(repo.path(), &["init", "-q"]);

    fs::write(repo.path().join("check.toml"), "[checks]\n").unwrap();
    fs::write(repo.path().join("Cargo.lock"), "version = 3\n").unwrap();
    fs::write(repo.path().join("notes.txt"), "a\n").unwrap();
    git(repo.path(), &["add", "-A"]);
    git(repo.path(), &["commit", "-q", "-m", "initial"]);

    fs::write(repo.path().join("Cargo.lock"), "version = 4\n").unwrap();
    fs::write(repo.path().join("notes.txt"), "b\n").unwrap();
    fs::write(repo.path().join("check.toml"), "[checks]\nextra = true\n").unwrap();
    git(repo.path(), &["add", "-A"]);
    git(repo.path(), &["commit", "-q", "-m", "bump lockfile"]);

    repo
}

#[tokio::test]
async fn classifies_changes_between_commits() {
    let repo = two_commit_repo();

    let detection = detect_dependency_changes(
        &SystemGit,
        &tracked(),
        repo.path(),
        &DetectOptions {
            base_commit: "HEAD~1".to_string(),
            target_commit: "HEAD".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(detection.has_changes);
    // check.toml + Cargo.lock are tracked; notes.txt is not.
    assert_eq!(detection.total_tracked_files, 2);
    assert_eq!(detection.changes.len(), 2);

    let lockfile = detection
        .changes
        .iter()
        .find(|c| c.file == "Cargo.lock")
        .unwrap();
    assert_eq!(lockfile.status, ChangeStatus::Modified);
    assert_eq!(lockfile.check_type, "lockfile");
    assert!(!lockfile.always_tracked);

    let manifest = detection
        .changes
        .iter()
        .find(|c| c.file == "check.toml")
        .unwrap();
    assert!(manifest.always_tracked);

    assert!(detection.changes.iter().all(|c| c.file != "notes.txt"));
    assert!(detection.by_check.contains_key("lockfile"));
}

#[tokio::test]
async fn equal_commits_detect_nothing() {
    let repo = two_commit_repo();

    let detection = detect_dependency_changes(
        &SystemGit,
        &tracked(),
        repo.path(),
        &DetectOptions {
            base_commit: "HEAD".to_string(),
            target_commit: "HEAD".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(!detection.has_changes);
    assert!(detection.changes.is_empty());
    // The tracked-file count is still reported.
    assert_eq!(detection.total_tracked_files, 2);
}

#[tokio::test]
async fn unknown_ref_is_an_error() {
    let repo = two_commit_repo();

    let result = detect_dependency_changes(
        &SystemGit,
        &tracked(),
        repo.path(),
        &DetectOptions {
            base_commit: "no-such-ref".to_string(),
            target_commit: "HEAD".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
}
