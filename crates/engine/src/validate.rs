use std::path::Path;
use std::time::Duration;

use ticketsmith_kernel::validation::{CommandReport, ValidationOutcome};
use tokio::process::Command;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Validation — convention-based lint/test resolution and execution
// ---------------------------------------------------------------------------
//
// No per-repo configuration: the commands are resolved from what the repo
// already declares. Resolution order is package.json scripts, then Python
// project metadata, then Makefile targets. A repo matching none of these
// validates trivially.

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const FEEDBACK_STREAM_CAP: usize = 8_000;

/// Resolved validation commands; `None` means skip that check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationCommands {
    pub lint: Option<Vec<String>>,
    pub test: Option<Vec<String>>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Detect lint and test commands for the repo at `work_dir`.
///
/// Python tooling is probed with a short `--version` call, so a detected
/// command is one that can actually run in this environment.
pub async fn detect_commands(work_dir: &Path) -> ValidationCommands {
    // Node: package.json scripts.
    let pkg = work_dir.join("package.json");
    if pkg.is_file() {
        match std::fs::read_to_string(&pkg)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).map_err(|e| e.to_string()))
        {
            Ok(data) => {
                let scripts = data.get("scripts").and_then(|s| s.as_object());
                let has = |name: &str| scripts.is_some_and(|s| s.contains_key(name));
                let lint = if has("lint") {
                    Some(argv(&["npm", "run", "lint"]))
                } else if has("lint:fix") {
                    Some(argv(&["npm", "run", "lint:fix"]))
                } else {
                    None
                };
                let test = if has("test") {
                    Some(argv(&["npm", "test"]))
                } else if has("test:ci") {
                    Some(argv(&["npm", "run", "test:ci"]))
                } else {
                    None
                };
                return ValidationCommands { lint, test };
            }
            Err(e) => debug!(error = %e, "could not parse package.json"),
        }
    }

    // Python: pyproject.toml, setup.cfg or setup.py.
    let has_pyproject = work_dir.join("pyproject.toml").is_file();
    if has_pyproject || work_dir.join("setup.cfg").is_file() || work_dir.join("setup.py").is_file()
    {
        let mut lint = None;
        if has_pyproject {
            if probe(work_dir, &["ruff", "--version"]).await {
                lint = Some(argv(&["ruff", "check", "."]));
            } else if probe(work_dir, &["python", "-m", "pyflakes", "--version"]).await {
                lint = Some(argv(&["python", "-m", "pyflakes", "."]));
            }
        }
        let test = if probe(work_dir, &["python", "-m", "pytest", "--version"]).await {
            argv(&["python", "-m", "pytest", "-v", "--tb=short"])
        } else {
            argv(&["python", "-m", "unittest", "discover", "-v"])
        };
        return ValidationCommands {
            lint,
            test: Some(test),
        };
    }

    // Makefile targets, detected textually.
    let makefile = work_dir.join("Makefile");
    if makefile.is_file() {
        let content = std::fs::read_to_string(&makefile).unwrap_or_default();
        return ValidationCommands {
            lint: content.contains("lint").then(|| argv(&["make", "lint"])),
            test: content.contains("test").then(|| argv(&["make", "test"])),
        };
    }

    ValidationCommands::default()
}

async fn probe(work_dir: &Path, parts: &[&str]) -> bool {
    run_command(work_dir, &argv(parts), PROBE_TIMEOUT).await.passed()
}

/// Run one command under `work_dir` with a wall-clock timeout. Spawn
/// failures and timeouts come back as synthetic failed reports rather
/// than errors, so validation always yields feedback.
pub async fn run_command(work_dir: &Path, command: &[String], timeout: Duration) -> CommandReport {
    let rendered = command.join(" ");
    let Some((program, args)) = command.split_first() else {
        return CommandReport {
            command: rendered,
            exit_code: None,
            stdout: String::new(),
            stderr: "empty command".into(),
        };
    };

    let output = tokio::time::timeout(
        timeout,
        Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output(),
    )
    .await;

    match output {
        Ok(Ok(out)) => CommandReport {
            command: rendered,
            exit_code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        },
        Ok(Err(e)) => CommandReport {
            command: rendered.clone(),
            exit_code: None,
            stdout: String::new(),
            stderr: format!("command failed to start: {e}"),
        },
        Err(_) => CommandReport {
            command: rendered,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("command timed out after {}s", timeout.as_secs()),
        },
    }
}

/// Run the resolved lint and test commands and fold the results into a
/// single outcome with model-ready feedback.
pub async fn run_validation(work_dir: &Path, timeout: Duration) -> ValidationOutcome {
    let commands = detect_commands(work_dir).await;
    info!(lint = ?commands.lint, test = ?commands.test, "resolved validation commands");

    let lint = match &commands.lint {
        Some(cmd) => Some(run_command(work_dir, cmd, timeout).await),
        None => None,
    };
    let test = match &commands.test {
        Some(cmd) => Some(run_command(work_dir, cmd, timeout).await),
        None => None,
    };

    let feedback = format_feedback(lint.as_ref(), test.as_ref());
    ValidationOutcome::from_reports(lint, test, feedback)
}

/// Format failed command output as structured feedback for the model.
/// Each stream is capped so a noisy test run cannot blow the prompt.
pub fn format_feedback(lint: Option<&CommandReport>, test: Option<&CommandReport>) -> String {
    let mut parts = vec!["## Validation feedback (fix these issues)\n".to_string()];

    let mut section = |title: &str, report: &CommandReport| {
        parts.push(format!("### {title}"));
        parts.push(format!("Command: {}", report.command));
        let code = report
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "killed".into());
        parts.push(format!("Exit code: {code}"));
        if !report.stdout.trim().is_empty() {
            parts.push(format!("Stdout:\n{}", cap(report.stdout.trim())));
        }
        if !report.stderr.trim().is_empty() {
            parts.push(format!("Stderr:\n{}", cap(report.stderr.trim())));
        }
        parts.push(String::new());
    };

    if let Some(report) = lint.filter(|r| !r.passed()) {
        section("Linter failed", report);
    }
    if let Some(report) = test.filter(|r| !r.passed()) {
        section("Tests failed", report);
    }

    if parts.len() == 1 {
        return "All checks passed.".into();
    }
    parts.join("\n")
}

fn cap(s: &str) -> &str {
    if s.len() <= FEEDBACK_STREAM_CAP {
        return s;
    }
    let mut end = FEEDBACK_STREAM_CAP;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
