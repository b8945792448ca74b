use std::path::{Component, Path};

use ticketsmith_kernel::error::Result;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Edit protocol
// ---------------------------------------------------------------------------
//
// The implementation model emits one block per touched file:
//
//   EDIT_FILE: src/api/users.py
//   ```python
//   <full file content>
//   ```
//
// The fence language tag is free-form ("new" marks a new file). Each block
// carries the complete intended content of the file; applying a block is a
// whole-file write.

/// One parsed edit block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
}

/// Extract `EDIT_FILE` blocks from a raw model response.
///
/// Text outside blocks (notes, explanations) is ignored. A block whose
/// fence never closes is dropped rather than swallowing the rest of the
/// response.
pub fn parse_edits(raw: &str) -> Vec<FileEdit> {
    let mut edits = Vec::new();
    let mut lines = raw.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(path) = strip_edit_keyword(line.trim()) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }

        // Skip blank lines between the header and the fence.
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }
        if !lines.next().is_some_and(|l| l.trim_start().starts_with("```")) {
            warn!(path, "edit block without opening fence, skipping");
            continue;
        }

        let mut content_lines = Vec::new();
        let mut closed = false;
        for body in lines.by_ref() {
            if body.trim() == "```" {
                closed = true;
                break;
            }
            content_lines.push(body);
        }
        if !closed {
            warn!(path, "edit block fence never closed, skipping");
            continue;
        }

        edits.push(FileEdit {
            path: path.to_string(),
            content: content_lines.join("\n").trim_end().to_string(),
        });
    }

    edits
}

fn strip_edit_keyword(line: &str) -> Option<&str> {
    const KEYWORD: &str = "EDIT_FILE:";
    if line.len() >= KEYWORD.len() && line[..KEYWORD.len()].eq_ignore_ascii_case(KEYWORD) {
        Some(line[KEYWORD.len()..].trim())
    } else {
        None
    }
}

/// Reject absolute paths and any path with a `..` segment. Checked before
/// any filesystem write so a hostile response cannot escape the workspace.
pub fn is_safe_relative(path: &str) -> bool {
    let p = Path::new(path);
    !p.is_absolute()
        && p.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Apply parsed edits under `work_dir`, creating parent directories as
/// needed. Unsafe paths are skipped with a warning. Returns the relative
/// paths actually written.
pub fn apply_edits(work_dir: &Path, raw: &str) -> Result<Vec<String>> {
    let mut applied = Vec::new();
    for edit in parse_edits(raw) {
        if !is_safe_relative(&edit.path) {
            warn!(path = %edit.path, "skipping unsafe edit path");
            continue;
        }
        let full = work_dir.join(&edit.path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, &edit.content)?;
        applied.push(edit.path);
    }
    info!(count = applied.len(), files = ?applied, "applied edits");
    Ok(applied)
}
