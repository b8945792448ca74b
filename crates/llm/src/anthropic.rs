use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ModelClient, ModelError, ModelFuture, ModelRequest};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic messages-API client.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.into()),
            base_url: ANTHROPIC_API_URL.into(),
        }
    }

    /// Build from `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL`.
    ///
    /// A missing key is a distinguishable error so the pipeline can run in
    /// degraded mode instead of crashing.
    pub fn from_env() -> Result<Self, ModelError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ModelError::MissingApiKey("ANTHROPIC_API_KEY".into()))?;
        let model = std::env::var("ANTHROPIC_MODEL").ok().filter(|m| !m.is_empty());
        Ok(Self::new(key, model))
    }

    /// Custom base URL (for testing or proxying).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<String, ModelError> {
        debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            user_chars = request.user.len(),
            "model request"
        );
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.user,
            }],
        };

        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let resp_text = resp.text().await?;

        if status >= 400 {
            return Err(ModelError::Api {
                status,
                body: resp_text,
            });
        }

        let parsed: AnthropicResponse = serde_json::from_str(&resp_text)
            .map_err(|e| ModelError::Parse(format!("{e}: {resp_text}")))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();

        Ok(text.trim().to_string())
    }
}

impl ModelClient for AnthropicClient {
    fn complete(&self, request: ModelRequest<'_>) -> ModelFuture<'_> {
        let system = request.system.to_string();
        let user = request.user.to_string();
        let max_tokens = request.max_tokens;
        Box::pin(async move {
            self.send(ModelRequest {
                system: &system,
                user: &user,
                max_tokens,
            })
            .await
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}
