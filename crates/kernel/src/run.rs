use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RunStatus — terminal outcome of a pipeline run
// ---------------------------------------------------------------------------

/// How a run ended. Every variant passes through workspace cleanup and
/// idempotency release before being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Validation passed and a pull request was created.
    PrCreated,
    /// Changes were committed/pushed but the PR step failed.
    Committed,
    /// No code-generation credential configured; pipeline ran in degraded
    /// mode (clone + branch only) and stopped before delivery.
    CodegenDisabled,
    /// Validation still failing after the retry budget was spent.
    ValidationFailed,
    /// Validation passed but a delivery precondition was unmet.
    DeliverySkipped,
    /// Clone or branch setup failed fatally.
    WorkspaceFault,
    /// A model round-trip failed mid-run.
    ModelFault,
    /// The run exceeded its wall-clock budget.
    TimedOut,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::PrCreated => write!(f, "pr created"),
            RunStatus::Committed => write!(f, "committed"),
            RunStatus::CodegenDisabled => write!(f, "codegen disabled"),
            RunStatus::ValidationFailed => write!(f, "validation failed"),
            RunStatus::DeliverySkipped => write!(f, "delivery skipped"),
            RunStatus::WorkspaceFault => write!(f, "workspace fault"),
            RunStatus::ModelFault => write!(f, "model fault"),
            RunStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

// ---------------------------------------------------------------------------
// RunReport — what a finished run tells the caller
// ---------------------------------------------------------------------------

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub ticket_id: String,
    pub status: RunStatus,

    /// Feature branch, if branch creation succeeded.
    pub branch: Option<String>,

    /// Total implementation attempts made (first attempt included).
    pub attempts: u32,

    pub validation_passed: bool,

    pub pr_url: Option<String>,

    pub error: Option<String>,
}

impl RunReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.status, RunStatus::PrCreated)
    }
}
