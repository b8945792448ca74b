use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::provider::{CreatePullRequest, HostError, HostFuture, PullRequest, SourceHost};

const GITLAB_DEFAULT_URL: &str = "https://gitlab.com";

/// GitLab REST v4 host. Merge requests map onto the generic PR shape
/// (`number` carries the MR iid).
#[derive(Debug)]
pub struct GitLabHost {
    client: Client,
    token: String,
    base_url: String,
}

impl GitLabHost {
    pub fn new(token: String, instance_url: Option<String>) -> Self {
        let base = instance_url.unwrap_or_else(|| GITLAB_DEFAULT_URL.into());
        Self {
            client: Client::new(),
            token,
            base_url: format!("{}/api/v4", base.trim_end_matches('/')),
        }
    }

    fn project_path(owner: &str, name: &str) -> String {
        urlencoding::encode(&format!("{owner}/{name}")).into_owned()
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HostError> {
        let resp = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("PRIVATE-TOKEN", &self.token)
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
        let project = Self::project_path(&req.repo_owner, &req.repo_name);
        let path = format!("/projects/{project}/merge_requests");
        let body = serde_json::json!({
            "source_branch": req.head_branch,
            "target_branch": req.base_branch,
            "title": req.title,
            "description": req.body,
            "labels": req.labels.join(","),
        });
        let created = self.request(reqwest::Method::POST, &path, &body).await?;
        let mr: GitLabMr = serde_json::from_value(created)
            .map_err(|e| HostError::Parse(format!("unexpected MR shape: {e}")))?;

        // Reviewer assignment needs user-id resolution; skipped best-effort
        // when logins can't be mapped.
        if !req.reviewers.is_empty() {
            warn!(
                reviewers = ?req.reviewers,
                "gitlab reviewer assignment by login not supported, skipping"
            );
        }

        Ok(PullRequest {
            url: mr.web_url,
            number: mr.iid,
            id: mr.id,
        })
    }
}

impl SourceHost for GitLabHost {
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
        let project = Self::project_path(repo_owner, repo_name);
        let path = format!("/projects/{project}/merge_requests/{pr_number}");
        let body = serde_json::json!({ "add_labels": label });
        Box::pin(async move {
            self.request(reqwest::Method::PUT, &path, &body).await?;
            Ok(())
        })
    }
}

#[derive(Deserialize)]
struct GitLabMr {
    web_url: String,
    iid: u64,
    id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_path_is_urlencoded() {
        assert_eq!(GitLabHost::project_path("group", "repo"), "group%2Frepo");
    }

    #[test]
    fn mr_response_parses() {
        let raw = r#"{"web_url": "https://gitlab.com/g/r/-/merge_requests/3", "iid": 3, "id": 5512}"#;
        let mr: GitLabMr = serde_json::from_str(raw).unwrap();
        assert_eq!(mr.iid, 3);
        assert_eq!(mr.id, 5512);
    }

    #[test]
    fn instance_url_defaults_and_trims() {
        let default = GitLabHost::new("t".into(), None);
        assert_eq!(default.base_url, "https://gitlab.com/api/v4");
        let custom = GitLabHost::new("t".into(), Some("https://git.local/".into()));
        assert_eq!(custom.base_url, "https://git.local/api/v4");
    }
}
