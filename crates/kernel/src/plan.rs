use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlanAction — the three canonical file-level change intents
// ---------------------------------------------------------------------------

/// What a plan step does to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Modify,
    Delete,
}

impl PlanAction {
    /// Normalize a free-form action token. Unknown tokens become `Modify`
    /// rather than rejecting the step.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "create" => PlanAction::Create,
            "delete" => PlanAction::Delete,
            _ => PlanAction::Modify,
        }
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Modify => write!(f, "modify"),
            PlanAction::Delete => write!(f, "delete"),
        }
    }
}

// ---------------------------------------------------------------------------
// PlanStep / ImplementationPlan
// ---------------------------------------------------------------------------

/// One file-level change intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Path relative to the repository root.
    pub path: String,
    pub action: PlanAction,
    /// One-line rationale.
    pub reason: String,
}

/// Ordered sequence of plan steps plus an optional synopsis.
///
/// An empty plan is valid — it short-circuits implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub summary: String,
}

impl ImplementationPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the plan as bulleted text for prompt construction.
    pub fn to_prompt_text(&self) -> String {
        let mut out = self.summary.clone();
        for step in &self.steps {
            out.push_str(&format!(
                "\n- {}: {} — {}",
                step.path, step.action, step.reason
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_from_token_canonical() {
        assert_eq!(PlanAction::from_token("create"), PlanAction::Create);
        assert_eq!(PlanAction::from_token("MODIFY"), PlanAction::Modify);
        assert_eq!(PlanAction::from_token(" Delete "), PlanAction::Delete);
    }

    #[test]
    fn action_from_token_unknown_is_modify() {
        assert_eq!(PlanAction::from_token("refactor"), PlanAction::Modify);
        assert_eq!(PlanAction::from_token(""), PlanAction::Modify);
    }

    #[test]
    fn action_serde() {
        let json = serde_json::to_string(&PlanAction::Create).unwrap();
        assert_eq!(json, "\"create\"");
    }

    #[test]
    fn plan_prompt_text() {
        let plan = ImplementationPlan {
            steps: vec![PlanStep {
                path: "src/api.py".into(),
                action: PlanAction::Create,
                reason: "new endpoint".into(),
            }],
            summary: "Add endpoint".into(),
        };
        let text = plan.to_prompt_text();
        assert!(text.starts_with("Add endpoint"));
        assert!(text.contains("- src/api.py: create — new endpoint"));
    }

    #[test]
    fn empty_plan() {
        let plan = ImplementationPlan::default();
        assert!(plan.is_empty());
        assert!(plan.to_prompt_text().is_empty());
    }
}
