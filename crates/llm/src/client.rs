use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by ModelClient methods (for dyn compatibility).
pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// ModelClient trait
// ---------------------------------------------------------------------------

/// A single system-prompt + user-prompt round trip to a language model.
///
/// The pipeline only ever needs one-shot completions; conversation state is
/// carried in the prompt text (plan, file contents, validation feedback).
pub trait ModelClient: Send + Sync {
    fn complete(&self, request: ModelRequest<'_>) -> ModelFuture<'_>;
}

/// One completion request.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
}

/// Errors from a model client.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}
