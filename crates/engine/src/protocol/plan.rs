use ticketsmith_kernel::plan::{ImplementationPlan, PlanAction, PlanStep};

// ---------------------------------------------------------------------------
// Plan protocol
// ---------------------------------------------------------------------------
//
// The planning model emits steps as keyword triplets:
//
//   - FILE: src/routes/users.py
//     ACTION: modify
//     REASON: add the new endpoint
//
// followed by an optional trailing "SUMMARY:" line. Keywords are matched
// case-insensitively and an optional "-"/"*" bullet before FILE is allowed.
// A triplet missing its ACTION or REASON is dropped; everything else the
// model says around the triplets is ignored.

/// Parse a raw planning response into a structured plan.
///
/// Reasons and the summary keep only their first line, so a model that
/// rambles after the keyword cannot bloat downstream prompts.
pub fn parse_plan(raw: &str) -> ImplementationPlan {
    let mut steps = Vec::new();
    let mut summary = String::new();

    let mut pending_path: Option<String> = None;
    let mut pending_action: Option<PlanAction> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        let unbulleted = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('*'))
            .map(str::trim_start)
            .unwrap_or(trimmed);

        if let Some(path) = strip_keyword(unbulleted, "FILE:") {
            // A new FILE line abandons any incomplete triplet before it.
            pending_path = (!path.is_empty()).then(|| path.to_string());
            pending_action = None;
        } else if let Some(token) = strip_keyword(trimmed, "ACTION:") {
            if pending_path.is_some() {
                pending_action = Some(PlanAction::from_token(token));
            }
        } else if let Some(reason) = strip_keyword(trimmed, "REASON:") {
            if let (Some(path), Some(action)) = (pending_path.take(), pending_action.take()) {
                steps.push(PlanStep {
                    path,
                    action,
                    reason: reason.to_string(),
                });
            }
        } else if let Some(rest) = strip_keyword(trimmed, "SUMMARY:") {
            if summary.is_empty() {
                summary = rest.to_string();
            }
        }
    }

    ImplementationPlan { steps, summary }
}

/// Case-insensitive keyword match at line start; returns the trimmed rest.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    if line.len() >= keyword.len() && line[..keyword.len()].eq_ignore_ascii_case(keyword) {
        Some(line[keyword.len()..].trim())
    } else {
        None
    }
}
