pub mod batch;
pub mod run;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ticketsmith_engine::{Pipeline, Settings};
use ticketsmith_host::provider::HostCredentials;
use ticketsmith_kernel::task::TicketTask;
use ticketsmith_llm::anthropic::AnthropicClient;
use ticketsmith_llm::client::ModelClient;
use tracing::warn;

pub fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with_target(false)
        .init();
}

/// Build a pipeline from config file + environment credentials.
pub fn build_pipeline(config: Option<&Path>, remote_url: Option<String>) -> Result<Pipeline> {
    let settings = Settings::load(config)?;
    let model: Option<Arc<dyn ModelClient>> = match AnthropicClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "running degraded, code generation disabled");
            None
        }
    };
    let credentials = HostCredentials::from_env();

    let mut pipeline = Pipeline::new(settings, model, credentials);
    if let Some(url) = remote_url {
        pipeline = pipeline.with_remote_url(url);
    }
    Ok(pipeline)
}

pub fn load_task(path: &Path) -> Result<TicketTask> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read task file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid task JSON in {}", path.display()))
}
