use ticketsmith_kernel::task::TicketTask;

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

pub const PLANNING_SYSTEM: &str = "You are an expert software engineer. Your job is to produce a concise implementation plan only - no code.

Rules:
- Output a structured plan: for each file, state the path (relative to repo root), action (create | modify | delete), and a one-line reason.
- Use the repository map to decide which files to touch. Do not invent files that are not suggested by the map or the task.
- Be minimal: only list files that need changes. Prefer modifying existing files over creating new ones when appropriate.
- Respect existing architecture and naming conventions visible in the map.
- Do not output code, only the plan.";

pub const IMPLEMENTATION_SYSTEM: &str = "You are an expert software engineer implementing a task. You must output concrete edits only.

Rules:
- Write production-ready code. No TODOs, no placeholder comments, no commented-out code.
- Follow clean code: clear names, small functions, avoid duplication.
- Match the existing style and patterns visible in the file contents.
- Output edits in this exact format for each change:

EDIT_FILE: <relative path>
```<language or \"new\">
<full file content>
```
If the file is new, use ```new and provide full content. If modifying, send the full intended file content.

- Make one EDIT_FILE block per file. You may output multiple EDIT_FILE blocks in one message.
- Do not output explanations outside EDIT_FILE blocks. Optional: after all blocks, add NOTES: for the reviewer.";

/// User message for the planning call.
pub fn planning_user(task: &TicketTask, repo_map: &str) -> String {
    let acceptance_section = if task.acceptance_criteria.is_empty() {
        String::new()
    } else {
        let bullets: Vec<String> = task
            .acceptance_criteria
            .iter()
            .map(|c| format!("- {c}"))
            .collect();
        format!("Acceptance criteria:\n{}", bullets.join("\n"))
    };

    format!(
        "## Task\n\
         Ticket: {ticket}\n\
         Title: {title}\n\
         \n\
         Description:\n\
         {description}\n\
         \n\
         {acceptance_section}\n\
         \n\
         ## Repository map\n\
         {repo_map}\n\
         \n\
         ## Instructions\n\
         Produce an implementation plan. For each step use this format:\n\
         - FILE: <relative path>\n\
         \x20\x20ACTION: create | modify | delete\n\
         \x20\x20REASON: <one line>\n\
         \n\
         You may add a short summary at the end after \"SUMMARY:\". Do not write any code.",
        ticket = task.ticket_id,
        title = or_placeholder(&task.title, "(no title)"),
        description = or_placeholder(&task.description, "(no description)"),
        repo_map = or_placeholder(repo_map, "(no map)"),
    )
}

/// User message for the implementation call.
pub fn implementation_user(
    task: &TicketTask,
    plan_text: &str,
    repo_map: &str,
    file_contents: &str,
) -> String {
    format!(
        "## Task\n\
         Ticket: {ticket}\n\
         Title: {title}\n\
         \n\
         Description:\n\
         {description}\n\
         \n\
         ## Implementation plan (follow this)\n\
         {plan_text}\n\
         \n\
         ## Repository map (for context)\n\
         {repo_map}\n\
         \n\
         ## Relevant file contents\n\
         {file_contents}\n\
         \n\
         ## Instructions\n\
         Implement the plan. Output EDIT_FILE blocks only. Do not skip any file from the plan. \
         Use the exact relative paths from the plan.",
        ticket = task.ticket_id,
        title = or_placeholder(&task.title, "(no title)"),
        description = or_placeholder(&task.description, "(no description)"),
        plan_text = or_placeholder(plan_text, "(fix validation issues only)"),
        repo_map = or_placeholder(repo_map, "(no map)"),
    )
}

/// Appended to the implementation message on self-heal attempts.
pub fn feedback_appendix(feedback: &str) -> String {
    format!(
        "\n\n## Previous attempt failed validation - fix these issues\n\
         {feedback}\n\
         \n\
         Apply minimal edits to fix the above. Output EDIT_FILE blocks only."
    )
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketsmith_kernel::task::GitProvider;

    fn task() -> TicketTask {
        TicketTask {
            ticket_id: "#42".into(),
            title: "Add endpoint".into(),
            description: "Expose GET /users".into(),
            acceptance_criteria: vec!["returns 200".into()],
            labels: vec![],
            reporter: None,
            provider: GitProvider::Github,
            repo_owner: "acme".into(),
            repo_name: "api".into(),
            repo_full_name: "acme/api".into(),
            default_branch: "main".into(),
            raw_payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn planning_prompt_carries_task_and_criteria() {
        let msg = planning_user(&task(), "src/app.py");
        assert!(msg.contains("Ticket: #42"));
        assert!(msg.contains("Title: Add endpoint"));
        assert!(msg.contains("- returns 200"));
        assert!(msg.contains("src/app.py"));
    }

    #[test]
    fn empty_fields_get_placeholders() {
        let mut t = task();
        t.title.clear();
        t.description.clear();
        let msg = planning_user(&t, "");
        assert!(msg.contains("(no title)"));
        assert!(msg.contains("(no description)"));
        assert!(msg.contains("(no map)"));
    }

    #[test]
    fn implementation_prompt_includes_plan_and_contents() {
        let msg = implementation_user(&task(), "- a.py: modify", "map", "### a.py\nbody");
        assert!(msg.contains("- a.py: modify"));
        assert!(msg.contains("### a.py"));
        assert!(msg.contains("EDIT_FILE blocks only"));
    }

    #[test]
    fn empty_plan_text_falls_back_to_fix_only() {
        let msg = implementation_user(&task(), "", "map", "(no plan; fix issues below)");
        assert!(msg.contains("(fix validation issues only)"));
    }

    #[test]
    fn feedback_appendix_embeds_feedback() {
        let appendix = feedback_appendix("### Lint failed\nE501");
        assert!(appendix.contains("failed validation"));
        assert!(appendix.contains("E501"));
    }
}
