use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GitProvider — which source host the task's repository lives on
// ---------------------------------------------------------------------------

/// Source-host provider for a task's repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProvider {
    Github,
    Gitlab,
}

impl std::fmt::Display for GitProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitProvider::Github => write!(f, "github"),
            GitProvider::Gitlab => write!(f, "gitlab"),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketTask — canonical, immutable input to a run
// ---------------------------------------------------------------------------

/// Structured task context extracted from an inbound ticket event.
///
/// Created once by the intake layer; read-only for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTask {
    /// Ticket/issue identifier, e.g. "#42" or "PROJ-17".
    pub ticket_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    #[serde(default)]
    pub labels: Vec<String>,

    /// Ticket reporter — the reviewer candidate for the eventual PR.
    #[serde(default)]
    pub reporter: Option<String>,

    pub provider: GitProvider,

    /// Owner/org or group.
    pub repo_owner: String,

    /// Repository name.
    pub repo_name: String,

    /// e.g. "owner/repo" or "group/repo".
    pub repo_full_name: String,

    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Original payload kept verbatim for traceability.
    #[serde(default)]
    pub raw_payload: serde_json::Value,
}

fn default_branch() -> String {
    "main".into()
}

// ---------------------------------------------------------------------------
// IdempotencyKey — (ticket, repository) run de-duplication key
// ---------------------------------------------------------------------------

/// Key under which a run is admitted: (ticket identifier, repository full
/// name), trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub ticket_id: String,
    pub repo_full_name: String,
}

impl IdempotencyKey {
    pub fn new(ticket_id: &str, repo_full_name: &str) -> Self {
        Self {
            ticket_id: ticket_id.trim().to_string(),
            repo_full_name: repo_full_name.trim().to_string(),
        }
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ticket_id, self.repo_full_name)
    }
}

impl From<&TicketTask> for IdempotencyKey {
    fn from(task: &TicketTask) -> Self {
        Self::new(&task.ticket_id, &task.repo_full_name)
    }
}
