/// Top-level framework error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("clone failed: {0}")]
    CloneFailed(String),

    #[error("nothing to commit (working tree clean)")]
    NothingToCommit,

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("source host error: {0}")]
    Host(String),

    #[error("pipeline stage `{stage}` failed: {reason}")]
    Pipeline { stage: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
