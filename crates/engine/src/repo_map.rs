use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

// ---------------------------------------------------------------------------
// Repository map
// ---------------------------------------------------------------------------
//
// A compact text picture of the cloned repo for the planning prompt: the
// file tree plus per-file top-level symbols pulled out with regexes. Cheap
// and language-agnostic enough; no parser toolchain in the workspace.

const MAX_MAP_CHARS: usize = 30_000;
const MAX_TREE_FILES: usize = 500;

const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    "dist",
    "build",
    ".eggs",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "target",
];

const SOURCE_EXT: &[&str] = &[
    "py", "ts", "tsx", "js", "jsx", "go", "rs", "java", "kt", "rb", "php",
];
const DOC_EXT: &[&str] = &["md", "json", "yaml", "yml", "toml"];

struct SymbolPatterns {
    py_def: Regex,
    py_class: Regex,
    js_func: Regex,
    js_class: Regex,
    js_const_fn: Regex,
    rs_item: Regex,
}

impl SymbolPatterns {
    fn new() -> Self {
        // Anchored at line start; multiline mode so ^ matches each line.
        Self {
            py_def: Regex::new(r"(?m)^(?:async\s+)?def\s+(\w+)\s*\(").unwrap(),
            py_class: Regex::new(r"(?m)^class\s+(\w+)").unwrap(),
            js_func: Regex::new(r"(?m)^(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\(").unwrap(),
            js_class: Regex::new(r"(?m)^(?:export\s+)?class\s+(\w+)").unwrap(),
            js_const_fn: Regex::new(r"(?m)^(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s+)?\(")
                .unwrap(),
            rs_item: Regex::new(r"(?m)^(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|struct|enum|trait)\s+(\w+)").unwrap(),
        }
    }

    fn extract(&self, content: &str, ext: &str) -> Vec<String> {
        let captures = |re: &Regex| {
            re.captures_iter(content)
                .map(|c| c[1].to_string())
                .collect::<Vec<_>>()
        };
        match ext {
            "py" => {
                let mut symbols = captures(&self.py_class);
                symbols.extend(captures(&self.py_def));
                symbols
            }
            "ts" | "tsx" | "js" | "jsx" => {
                let mut symbols = captures(&self.js_class);
                symbols.extend(captures(&self.js_func));
                symbols.extend(captures(&self.js_const_fn));
                symbols
            }
            "rs" => captures(&self.rs_item),
            _ => Vec::new(),
        }
    }
}

fn skip_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || (name.starts_with('.') && name != ".github")
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() {
                if !skip_dir(&name) {
                    stack.push(path);
                }
            } else if path.is_file() {
                let keep = extension(&path)
                    .map(|e| SOURCE_EXT.contains(&e) || DOC_EXT.contains(&e))
                    .unwrap_or(false);
                if keep {
                    if let Ok(rel) = path.strip_prefix(root) {
                        files.push(rel.to_path_buf());
                    }
                }
            }
        }
    }
    files.sort();
    files
}

/// Build the repository map for `work_dir`, capped at a fixed character
/// budget so it always fits the planning prompt.
pub fn build_map(work_dir: &Path) -> String {
    if !work_dir.is_dir() {
        return String::new();
    }

    let files = collect_files(work_dir);
    let patterns = SymbolPatterns::new();
    let mut out = String::new();

    let mut push = |out: &mut String, s: &str| -> bool {
        if out.len() + s.len() > MAX_MAP_CHARS {
            return false;
        }
        out.push_str(s);
        true
    };

    push(&mut out, "## Repository structure\n");
    for rel in files.iter().take(MAX_TREE_FILES) {
        if !push(&mut out, &format!("{}\n", rel.display())) {
            break;
        }
    }
    push(&mut out, "\n## Key symbols by file\n");

    for rel in &files {
        if out.len() >= MAX_MAP_CHARS {
            break;
        }
        let Some(ext) = extension(rel).filter(|e| SOURCE_EXT.contains(e)) else {
            continue;
        };
        let content = match std::fs::read_to_string(work_dir.join(rel)) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %rel.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let symbols = patterns.extract(&content, ext);
        if symbols.is_empty() {
            continue;
        }
        let block = format!("### {}\n  {}\n", rel.display(), symbols.join(", "));
        if !push(&mut out, &block) {
            break;
        }
    }

    out
}
