//! Hosting API boundary.
//!
//! The org scanner talks to its host through the [`HostClient`] trait so it
//! can be driven against an in-memory fake in tests. [`GitHubHost`] is the
//! octocrab-backed implementation, including the duplicate-issue search
//! that keeps issue creation idempotent per violation signature.

mod error;

pub use error::HostError;

use async_trait::async_trait;
use octocrab::Octocrab;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Result of an idempotent issue creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// A new tracking issue was created.
    Created { number: u64, url: String },

    /// An open issue with the same dedupe key already exists.
    Existing { number: u64 },
}

/// Capabilities the org scanner requires from its host.
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Lists repository names in an organization.
    async fn list_repos(&self, org: &str) -> Result<Vec<String>, HostError>;

    /// Whether a named repository exists in the organization.
    async fn repo_exists(&self, org: &str, name: &str) -> Result<bool, HostError>;

    /// Whether the repository received a commit within the window.
    async fn recent_commit(
        &self,
        org: &str,
        name: &str,
        since_hours: u64,
    ) -> Result<bool, HostError>;

    /// Creates at most one open tracking issue per dedupe key.
    async fn create_issue(
        &self,
        org: &str,
        name: &str,
        title: &str,
        body: &str,
        dedupe_key: &str,
    ) -> Result<IssueOutcome, HostError>;

    /// Authenticated clone URL for a repository.
    fn clone_url(&self, org: &str, name: &str) -> String;
}

/// [`HostClient`] implementation backed by the GitHub API.
pub struct GitHubHost {
    octocrab: Octocrab,
    token: String,
}

impl GitHubHost {
    /// Builds a host client from a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the underlying client cannot be constructed.
    pub fn new(token: String) -> Result<Self, HostError> {
        let octocrab = Octocrab::builder().personal_token(token.clone()).build()?;
        Ok(Self { octocrab, token })
    }
}

#[async_trait]
impl HostClient for GitHubHost {
    async fn list_repos(&self, org: &str) -> Result<Vec<String>, HostError> {
        debug!(org = %org, "Listing repositories");

        let mut names = Vec::new();
        let mut page = self
            .octocrab
            .orgs(org)
            .list_repos()
            .per_page(100)
            .send()
            .await?;

        loop {
            names.extend(page.items.iter().map(|repo| repo.name.clone()));
            match self
                .octocrab
                .get_page::<octocrab::models::Repository>(&page.next)
                .await?
            {
                Some(next) => page = next,
                None => break,
            }
        }

        info!(org = %org, count = names.len(), "Repository listing complete");
        Ok(names)
    }

    async fn repo_exists(&self, org: &str, name: &str) -> Result<bool, HostError> {
        match self.octocrab.repos(org, name).get().await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn recent_commit(
        &self,
        org: &str,
        name: &str,
        since_hours: u64,
    ) -> Result<bool, HostError> {
        let repo = self.octocrab.repos(org, name).get().await?;
        let Some(pushed_at) = repo.pushed_at else {
            return Ok(false);
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let window = (since_hours as i64).saturating_mul(3600);
        Ok(pushed_at.timestamp() >= now - window)
    }

    async fn create_issue(
        &self,
        org: &str,
        name: &str,
        title: &str,
        body: &str,
        dedupe_key: &str,
    ) -> Result<IssueOutcome, HostError> {
        if let Some(existing) = self.find_existing_issue(org, name, dedupe_key).await? {
            info!(issue_number = existing, "Duplicate issue exists, skipping");
            return Ok(IssueOutcome::Existing { number: existing });
        }

        match self
            .octocrab
            .issues(org, name)
            .create(title)
            .body(body)
            .send()
            .await
        {
            Ok(issue) => {
                info!(issue_number = issue.number, "Issue created");
                Ok(IssueOutcome::Created {
                    number: issue.number,
                    url: issue.html_url.to_string(),
                })
            }
            Err(e) if is_permission_denied(&e) => {
                warn!(repo = %format!("{org}/{name}"), "Permission denied creating issue");
                Err(HostError::PermissionDenied {
                    owner: org.to_string(),
                    repo: name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn clone_url(&self, org: &str, name: &str) -> String {
        format!(
            "https://x-access-token:{}@github.com/{org}/{name}.git",
            self.token
        )
    }
}

impl GitHubHost {
    /// Searches open issues for the dedupe marker.
    async fn find_existing_issue(
        &self,
        org: &str,
        name: &str,
        dedupe_key: &str,
    ) -> Result<Option<u64>, HostError> {
        let query = format!("repo:{org}/{name} is:issue is:open \"{dedupe_key}\"");
        debug!(query = %query, "Checking for duplicate issue");

        let results = self
            .octocrab
            .search()
            .issues_and_pull_requests(&query)
            .send()
            .await?;

        for issue in &results.items {
            let body_matches = issue
                .body
                .as_deref()
                .is_some_and(|body| body.contains(dedupe_key));
            if body_matches {
                return Ok(Some(issue.number));
            }
        }

        Ok(None)
    }
}

/// Checks if an error is a 404 from the API.
fn is_not_found(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404
    )
}

/// Checks if an error indicates permission denied.
fn is_permission_denied(error: &octocrab::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("403") || msg.contains("forbidden") || msg.contains("permission")
}
