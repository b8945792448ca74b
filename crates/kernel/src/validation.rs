use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CommandReport — captured result of one validation command
// ---------------------------------------------------------------------------

/// Result of running one lint/test command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandReport {
    /// The invoked command line, e.g. "npm run lint".
    pub command: String,

    /// Exit code. `None` means the process was killed or produced no code
    /// (a synthetic failure report still carries diagnostic stderr).
    pub exit_code: Option<i32>,

    pub stdout: String,
    pub stderr: String,
}

impl CommandReport {
    /// Zero exit means the command passed.
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

/// Outcome of one validation attempt.
///
/// `success` holds iff every command that was run exited zero. A command that
/// was never run (no convention matched) counts as trivially satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub success: bool,

    /// Bounded, structured feedback suitable as model input.
    pub feedback: String,

    /// `None` when no lint convention was detected.
    pub lint: Option<CommandReport>,

    /// `None` when no test convention was detected.
    pub test: Option<CommandReport>,
}

impl ValidationOutcome {
    /// Build an outcome from the per-command reports, computing `success`
    /// per the skip-counts-as-pass invariant.
    pub fn from_reports(
        lint: Option<CommandReport>,
        test: Option<CommandReport>,
        feedback: String,
    ) -> Self {
        let lint_ok = lint.as_ref().is_none_or(CommandReport::passed);
        let test_ok = test.as_ref().is_none_or(CommandReport::passed);
        Self {
            success: lint_ok && test_ok,
            feedback,
            lint,
            test,
        }
    }
}
