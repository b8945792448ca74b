use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::provider::{CreatePullRequest, HostError, HostFuture, PullRequest, SourceHost};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "ticketsmith";

/// GitHub REST v3 host.
#[derive(Debug)]
pub struct GitHubHost {
    client: Client,
    token: String,
    base_url: String,
}

impl GitHubHost {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
            base_url: GITHUB_API_URL.into(),
        }
    }

    /// Custom base URL (for testing or GitHub Enterprise).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HostError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .header("user-agent", USER_AGENT)
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        if status >= 400 {
            return Err(HostError::Api { status, body: text });
        }
        serde_json::from_str(&text).map_err(|e| HostError::Parse(format!("{e}: {text}")))
    }

    async fn create(&self, req: CreatePullRequest) -> Result<PullRequest, HostError> {
        let path = format!("/repos/{}/{}/pulls", req.repo_owner, req.repo_name);
        let body = serde_json::json!({
            "title": req.title,
            "body": req.body,
            "head": req.head_branch,
            "base": req.base_branch,
        });
        let created = self.post_json(&path, &body).await?;
        let pr: GitHubPr = serde_json::from_value(created)
            .map_err(|e| HostError::Parse(format!("unexpected PR shape: {e}")))?;

        // Reviewer assignment is best-effort.
        if !req.reviewers.is_empty() {
            let path = format!(
                "/repos/{}/{}/pulls/{}/requested_reviewers",
                req.repo_owner, req.repo_name, pr.number
            );
            let body = serde_json::json!({ "reviewers": req.reviewers });
            if let Err(e) = self.post_json(&path, &body).await {
                warn!(error = %e, "could not set reviewers");
            }
        }

        // Labeling is best-effort.
        if !req.labels.is_empty() {
            let path = format!(
                "/repos/{}/{}/issues/{}/labels",
                req.repo_owner, req.repo_name, pr.number
            );
            let body = serde_json::json!({ "labels": req.labels });
            if let Err(e) = self.post_json(&path, &body).await {
                warn!(error = %e, "could not add labels");
            }
        }

        Ok(PullRequest {
            url: pr.html_url,
            number: pr.number,
            id: pr.id,
        })
    }
}

impl SourceHost for GitHubHost {
    fn create_pull_request(&self, req: CreatePullRequest) -> HostFuture<'_, PullRequest> {
        Box::pin(self.create(req))
    }

    fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> HostFuture<'_, ()> {
        let path = format!("/repos/{repo_owner}/{repo_name}/issues/{pr_number}/labels");
        let body = serde_json::json!({ "labels": [label] });
        Box::pin(async move {
            self.post_json(&path, &body).await?;
            Ok(())
        })
    }
}

#[derive(Deserialize)]
struct GitHubPr {
    html_url: String,
    number: u64,
    id: u64,
}
