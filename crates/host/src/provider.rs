use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use ticketsmith_kernel::task::GitProvider;

use crate::github::GitHubHost;
use crate::gitlab::GitLabHost;

/// Boxed future returned by SourceHost methods (for dyn compatibility).
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, HostError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// SourceHost trait
// ---------------------------------------------------------------------------

/// A source host knows how to publish a pull/merge request for a pushed
/// branch and how to label it afterwards.
///
/// Optional steps inside `create_pull_request` (reviewer assignment,
/// labeling) must never abort PR creation — implementations log and move on.
pub trait SourceHost: std::fmt::Debug + Send + Sync {
    fn create_pull_request(&self, req: CreatePullRequest) -> HostFuture<'_, PullRequest>;

    fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> HostFuture<'_, ()>;
}

/// Parameters for a pull/merge request.
#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub repo_owner: String,
    pub repo_name: String,
    pub head_branch: String,
    pub base_branch: String,
    pub title: String,
    pub body: String,
    pub reviewers: Vec<String>,
    pub labels: Vec<String>,
}

/// A created pull/merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub url: String,
    pub number: u64,
    pub id: u64,
}

/// Errors from a source host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("missing token: {0}")]
    MissingToken(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Provider selection
// ---------------------------------------------------------------------------

/// Host tokens as loaded from the environment by the caller.
#[derive(Debug, Clone, Default)]
pub struct HostCredentials {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    /// GitLab instance URL; defaults to gitlab.com when unset.
    pub gitlab_url: Option<String>,
}

impl HostCredentials {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            github_token: non_empty("GITHUB_TOKEN"),
            gitlab_token: non_empty("GITLAB_TOKEN"),
            gitlab_url: non_empty("GITLAB_URL"),
        }
    }

    /// At least one credential set present — the delivery gate precondition.
    pub fn any_configured(&self) -> bool {
        self.github_token.is_some() || self.gitlab_token.is_some()
    }
}

/// Select the host implementation for a task's provider.
///
/// Exhaustive match over the closed provider enum; a missing token for the
/// selected provider is a distinguishable error.
pub fn for_provider(
    provider: GitProvider,
    credentials: &HostCredentials,
) -> Result<Box<dyn SourceHost>, HostError> {
    match provider {
        GitProvider::Github => {
            let token = credentials
                .github_token
                .clone()
                .ok_or_else(|| HostError::MissingToken("GITHUB_TOKEN".into()))?;
            Ok(Box::new(GitHubHost::new(token)))
        }
        GitProvider::Gitlab => {
            let token = credentials
                .gitlab_token
                .clone()
                .ok_or_else(|| HostError::MissingToken("GITLAB_TOKEN".into()))?;
            Ok(Box::new(GitLabHost::new(token, credentials.gitlab_url.clone())))
        }
    }
}
