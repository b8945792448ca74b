use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ticketsmith_host::provider::{
    self, CreatePullRequest, HostCredentials, HostError, SourceHost,
};
use ticketsmith_kernel::error::{Error, Result};
use ticketsmith_kernel::plan::ImplementationPlan;
use ticketsmith_kernel::run::{RunReport, RunStatus};
use ticketsmith_kernel::task::TicketTask;
use ticketsmith_llm::client::{ModelClient, ModelRequest};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::protocol::{edit, plan as plan_protocol};
use crate::{prompts, repo_map, validate, workspace};

// ---------------------------------------------------------------------------
// Pipeline — clone → branch → map → plan → implement → validate → deliver
// ---------------------------------------------------------------------------

const PLAN_MAX_TOKENS: u32 = 4_096;
const IMPLEMENT_MAX_TOKENS: u32 = 16_384;
const COMMIT_MESSAGE_MAX: usize = 200;
const PR_TITLE_MAX: usize = 256;
const FILE_CONTEXT_MAX_LINES: usize = 500;

/// Builds the source-host client for a task's provider.
pub type HostFactory = Arc<
    dyn Fn(
            ticketsmith_kernel::task::GitProvider,
            &HostCredentials,
        ) -> std::result::Result<Box<dyn SourceHost>, HostError>
        + Send
        + Sync,
>;

/// One pipeline instance, shared across runs.
///
/// `model` is `None` when no model credential is configured; the pipeline
/// then runs degraded (clone and branch only) and never attempts delivery.
pub struct Pipeline {
    settings: Settings,
    model: Option<Arc<dyn ModelClient>>,
    credentials: HostCredentials,
    remote_url: Option<String>,
    host_factory: HostFactory,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        model: Option<Arc<dyn ModelClient>>,
        credentials: HostCredentials,
    ) -> Self {
        Self {
            settings,
            model,
            credentials,
            remote_url: None,
            host_factory: Arc::new(provider::for_provider),
        }
    }

    /// Override the computed clone URL, e.g. for a read-through mirror or a
    /// local repository.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Substitute the source-host construction, e.g. for an enterprise
    /// instance or a stub host.
    pub fn with_host_factory(mut self, factory: HostFactory) -> Self {
        self.host_factory = factory;
        self
    }

    /// Run the full pipeline for one task. Never panics and never returns
    /// early without workspace cleanup; every outcome is a `RunReport`.
    pub async fn run(&self, task: &TicketTask) -> RunReport {
        let run_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let work_dir = self.work_dir(task, &run_id);
        info!(ticket = %task.ticket_id, run_id, "pipeline started");

        let budget = Duration::from_secs(self.settings.limits.task_timeout_seconds);
        let report = match tokio::time::timeout(budget, self.drive(task, &run_id, &work_dir)).await
        {
            Ok(report) => report,
            Err(_) => RunReport {
                run_id: run_id.clone(),
                ticket_id: task.ticket_id.clone(),
                status: RunStatus::TimedOut,
                branch: None,
                attempts: 0,
                validation_passed: false,
                pr_url: None,
                error: Some(format!("run exceeded {}s budget", budget.as_secs())),
            },
        };

        workspace::cleanup(&work_dir);
        info!(
            ticket = %task.ticket_id,
            run_id,
            status = %report.status,
            attempts = report.attempts,
            "pipeline finished"
        );
        report
    }

    fn work_dir(&self, task: &TicketTask, run_id: &str) -> PathBuf {
        let ticket = task.ticket_id.replace(['#', '!'], "");
        Path::new(&self.settings.workspace.base_dir)
            .join(format!("{}_{}_{}", task.repo_name, run_id, ticket))
    }

    async fn drive(&self, task: &TicketTask, run_id: &str, work_dir: &Path) -> RunReport {
        let mut report = RunReport {
            run_id: run_id.to_string(),
            ticket_id: task.ticket_id.clone(),
            status: RunStatus::WorkspaceFault,
            branch: None,
            attempts: 0,
            validation_passed: false,
            pr_url: None,
            error: None,
        };

        if let Err(e) = self.execute(task, work_dir, &mut report).await {
            report.status = match &e {
                Error::ModelUnavailable(_) => RunStatus::ModelFault,
                _ => RunStatus::WorkspaceFault,
            };
            report.error = Some(e.to_string());
            warn!(ticket = %task.ticket_id, error = %e, "pipeline run failed");
        }
        report
    }

    async fn execute(
        &self,
        task: &TicketTask,
        work_dir: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let url = match &self.remote_url {
            Some(url) => url.clone(),
            None => workspace::clone_url(task, &self.credentials),
        };
        let pin = (!task.default_branch.is_empty()).then_some(task.default_branch.as_str());
        workspace::clone_repo(&url, work_dir, pin).await?;
        let branch = workspace::create_feature_branch(work_dir, task).await?;
        info!(ticket = %task.ticket_id, branch, "clone and branch ready");
        report.branch = Some(branch.clone());

        let Some(model) = &self.model else {
            info!(ticket = %task.ticket_id, "no model credential, skipping code generation");
            report.status = RunStatus::CodegenDisabled;
            return Ok(());
        };

        let map = repo_map::build_map(work_dir);
        let plan = self.plan(model.as_ref(), task, &map).await?;
        info!(ticket = %task.ticket_id, steps = plan.steps.len(), "plan created");
        self.implement(model.as_ref(), work_dir, task, &map, &plan, None)
            .await?;

        let retries = self.settings.limits.max_validation_retries;
        for attempt in 0..=retries {
            report.attempts = attempt + 1;
            let outcome = validate::run_validation(work_dir, self.settings.command_timeout()).await;
            if outcome.success {
                report.validation_passed = true;
                info!(ticket = %task.ticket_id, attempt = attempt + 1, "validation passed");
                break;
            }
            info!(ticket = %task.ticket_id, attempt = attempt + 1, "validation failed");
            if attempt < retries && !plan.is_empty() {
                self.implement(
                    model.as_ref(),
                    work_dir,
                    task,
                    &map,
                    &plan,
                    Some(&outcome.feedback),
                )
                .await?;
            } else {
                break;
            }
        }
        if !report.validation_passed {
            warn!(ticket = %task.ticket_id, "validation exhausted, skipping delivery");
            report.status = RunStatus::ValidationFailed;
            return Ok(());
        }

        if !self.credentials.any_configured() {
            info!(ticket = %task.ticket_id, "no host token configured, skipping delivery");
            report.status = RunStatus::DeliverySkipped;
            return Ok(());
        }

        match workspace::commit_all(work_dir, &commit_message(task)).await {
            Ok(()) => {}
            Err(Error::NothingToCommit) => {
                info!(ticket = %task.ticket_id, "working tree clean, nothing to deliver");
                report.status = RunStatus::DeliverySkipped;
                report.error = Some("nothing to commit".into());
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        workspace::push_branch(work_dir, &branch).await?;

        let host = match (self.host_factory)(task.provider, &self.credentials) {
            Ok(host) => host,
            Err(e) => {
                report.status = RunStatus::Committed;
                report.error = Some(e.to_string());
                return Ok(());
            }
        };
        let request = CreatePullRequest {
            repo_owner: task.repo_owner.clone(),
            repo_name: task.repo_name.clone(),
            head_branch: branch,
            base_branch: if task.default_branch.is_empty() {
                "main".into()
            } else {
                task.default_branch.clone()
            },
            title: pr_title(task),
            body: pr_body(task),
            reviewers: task.reporter.clone().into_iter().collect(),
            labels: if self.settings.delivery.pr_label.is_empty() {
                Vec::new()
            } else {
                vec![self.settings.delivery.pr_label.clone()]
            },
        };
        match host.create_pull_request(request).await {
            Ok(pr) => {
                info!(ticket = %task.ticket_id, url = %pr.url, "pull request created");
                report.pr_url = Some(pr.url);
                report.status = RunStatus::PrCreated;
            }
            Err(e) => {
                warn!(ticket = %task.ticket_id, error = %e, "pull request creation failed");
                report.status = RunStatus::Committed;
                report.error = Some(e.to_string());
            }
        }
        Ok(())
    }

    async fn plan(
        &self,
        model: &dyn ModelClient,
        task: &TicketTask,
        map: &str,
    ) -> Result<ImplementationPlan> {
        let user = prompts::planning_user(task, map);
        let raw = model
            .complete(ModelRequest {
                system: prompts::PLANNING_SYSTEM,
                user: &user,
                max_tokens: PLAN_MAX_TOKENS,
            })
            .await
            .map_err(|e| Error::ModelUnavailable(e.to_string()))?;
        Ok(plan_protocol::parse_plan(&raw))
    }

    /// One implementation round trip; applies the returned edits. A run with
    /// an empty plan and no feedback has nothing to ask for and is a no-op.
    async fn implement(
        &self,
        model: &dyn ModelClient,
        work_dir: &Path,
        task: &TicketTask,
        map: &str,
        plan: &ImplementationPlan,
        feedback: Option<&str>,
    ) -> Result<Vec<String>> {
        if plan.is_empty() && feedback.is_none() {
            info!(ticket = %task.ticket_id, "empty plan, skipping implementation");
            return Ok(Vec::new());
        }

        let plan_text = plan.to_prompt_text();
        let file_contents = if plan.is_empty() {
            "(no plan; fix issues below)".to_string()
        } else {
            gather_file_contents(work_dir, plan)
        };
        let mut user = prompts::implementation_user(task, &plan_text, map, &file_contents);
        if let Some(feedback) = feedback {
            user.push_str(&prompts::feedback_appendix(feedback));
        }

        let raw = model
            .complete(ModelRequest {
                system: prompts::IMPLEMENTATION_SYSTEM,
                user: &user,
                max_tokens: IMPLEMENT_MAX_TOKENS,
            })
            .await
            .map_err(|e| Error::ModelUnavailable(e.to_string()))?;
        edit::apply_edits(work_dir, &raw)
    }
}

// ---------------------------------------------------------------------------
// Prompt context and delivery text helpers
// ---------------------------------------------------------------------------

/// Current content of every planned file, for the implementation prompt.
/// Files slated for creation are marked new instead of read.
fn gather_file_contents(work_dir: &Path, plan: &ImplementationPlan) -> String {
    use ticketsmith_kernel::plan::PlanAction;

    let mut parts = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        if step.action == PlanAction::Create {
            parts.push(format!("### {} (new)\n(no existing content)\n", step.path));
        } else {
            parts.push(format!(
                "### {}\n{}\n",
                step.path,
                read_capped(work_dir, &step.path)
            ));
        }
    }
    parts.join("\n")
}

fn read_capped(work_dir: &Path, rel: &str) -> String {
    let full = work_dir.join(rel);
    if !full.is_file() {
        return "(file not found)".into();
    }
    match std::fs::read_to_string(&full) {
        Ok(raw) => {
            let lines: Vec<&str> = raw.lines().collect();
            if lines.len() > FILE_CONTEXT_MAX_LINES {
                format!(
                    "{}\n... (truncated)",
                    lines[..FILE_CONTEXT_MAX_LINES].join("\n")
                )
            } else {
                raw
            }
        }
        Err(e) => format!("(read error: {e})"),
    }
}

fn title_or_default(task: &TicketTask) -> &str {
    if task.title.trim().is_empty() {
        "Implement task"
    } else {
        &task.title
    }
}

fn truncate_chars(s: String, max: usize) -> String {
    if s.chars().count() <= max {
        s
    } else {
        s.chars().take(max).collect()
    }
}

fn commit_message(task: &TicketTask) -> String {
    truncate_chars(
        format!("{}: {}", task.ticket_id, title_or_default(task)),
        COMMIT_MESSAGE_MAX,
    )
}

fn pr_title(task: &TicketTask) -> String {
    truncate_chars(
        format!("{}: {}", task.ticket_id, title_or_default(task)),
        PR_TITLE_MAX,
    )
}

fn pr_body(task: &TicketTask) -> String {
    let mut parts = vec![
        format!("**Ticket:** {}", task.ticket_id),
        format!(
            "**Title:** {}",
            if task.title.trim().is_empty() {
                "(no title)"
            } else {
                &task.title
            }
        ),
        String::new(),
    ];
    if !task.description.trim().is_empty() {
        parts.push("## Description\n".into());
        parts.push(task.description.trim().to_string());
        parts.push(String::new());
    }
    if !task.acceptance_criteria.is_empty() {
        parts.push("## Acceptance criteria".into());
        for criterion in &task.acceptance_criteria {
            parts.push(format!("- {criterion}"));
        }
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use ticketsmith_host::provider::{HostFuture, PullRequest};
    use ticketsmith_kernel::task::GitProvider;
    use ticketsmith_llm::client::{ModelError, ModelFuture};

    fn git_identity() {
        for (key, value) in [
            ("GIT_AUTHOR_NAME", "Test"),
            ("GIT_AUTHOR_EMAIL", "test@example.com"),
            ("GIT_COMMITTER_NAME", "Test"),
            ("GIT_COMMITTER_EMAIL", "test@example.com"),
        ] {
            std::env::set_var(key, value);
        }
    }

    fn task() -> TicketTask {
        TicketTask {
            ticket_id: "#42".into(),
            title: "Add endpoint".into(),
            description: "Expose GET /users".into(),
            acceptance_criteria: vec!["returns 200".into()],
            labels: vec![],
            reporter: Some("alice".into()),
            provider: GitProvider::Github,
            repo_owner: "acme".into(),
            repo_name: "api".into(),
            repo_full_name: "acme/api".into(),
            default_branch: "main".into(),
            raw_payload: serde_json::Value::Null,
        }
    }

    /// Replays canned responses and records every user prompt it saw.
    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn feedback_requests(&self) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.contains("failed validation"))
                .count()
        }
    }

    impl ModelClient for ScriptedModel {
        fn complete(&self, request: ModelRequest<'_>) -> ModelFuture<'_> {
            self.requests.lock().unwrap().push(request.user.to_string());
            let next = self.responses.lock().unwrap().pop_front();
            Box::pin(async move {
                next.ok_or_else(|| ModelError::Parse("script exhausted".into()))
            })
        }
    }

    async fn seed_origin(root: &Path, extra: &[(&str, &str)]) -> String {
        use tokio::process::Command;

        let origin = root.join("origin.git");
        let seed = root.join("seed");
        std::fs::create_dir_all(&seed).unwrap();

        let run = |cwd: PathBuf, args: Vec<String>| async move {
            let out = Command::new("git")
                .args(&args)
                .current_dir(&cwd)
                .output()
                .await
                .unwrap();
            assert!(out.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
        };

        run(
            root.to_path_buf(),
            vec!["init".into(), "--bare".into(), "-b".into(), "main".into(), origin.to_string_lossy().into_owned()],
        )
        .await;
        run(seed.clone(), vec!["init".into(), "-b".into(), "main".into()]).await;
        run(seed.clone(), vec!["config".into(), "user.email".into(), "t@example.com".into()]).await;
        run(seed.clone(), vec!["config".into(), "user.name".into(), "T".into()]).await;

        std::fs::write(seed.join("README.md"), "# seed\n").unwrap();
        for (rel, content) in extra {
            std::fs::write(seed.join(rel), content).unwrap();
        }
        run(seed.clone(), vec!["add".into(), "-A".into()]).await;
        run(seed.clone(), vec!["commit".into(), "-m".into(), "seed".into()]).await;
        let remote = format!("file://{}", origin.display());
        run(seed.clone(), vec!["remote".into(), "add".into(), "origin".into(), remote.clone()]).await;
        run(seed.clone(), vec!["push".into(), "origin".into(), "main".into()]).await;
        remote
    }

    fn settings_with_base(base: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.workspace.base_dir = base.to_string_lossy().into_owned();
        settings
    }

    /// Records PR requests and answers with a fixed PR, or a host error.
    #[derive(Clone, Debug)]
    struct ScriptedHost {
        seen: Arc<Mutex<Vec<CreatePullRequest>>>,
        fail: bool,
    }

    impl ScriptedHost {
        fn new(fail: bool) -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                fail,
            }
        }

        fn factory(&self) -> HostFactory {
            let host = self.clone();
            Arc::new(move |_, _| Ok(Box::new(host.clone()) as Box<dyn SourceHost>))
        }
    }

    impl SourceHost for ScriptedHost {
        fn create_pull_request(&self, req: CreatePullRequest) -> HostFuture<'_, PullRequest> {
            self.seen.lock().unwrap().push(req);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(HostError::Api {
                        status: 502,
                        body: "bad gateway".into(),
                    })
                } else {
                    Ok(PullRequest {
                        url: "https://example.com/pr/1".into(),
                        number: 1,
                        id: 9,
                    })
                }
            })
        }

        fn add_label(&self, _: &str, _: &str, _: u64, _: &str) -> HostFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    async fn branch_in_origin(origin: &Path, branch: &str) -> bool {
        tokio::process::Command::new("git")
            .args(["rev-parse", "--verify", branch])
            .current_dir(origin)
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn github_credentials() -> HostCredentials {
        HostCredentials {
            github_token: Some("tok".into()),
            gitlab_token: None,
            gitlab_url: None,
        }
    }

    #[test]
    fn commit_message_and_pr_title_format_and_truncate() {
        let mut t = task();
        assert_eq!(commit_message(&t), "#42: Add endpoint");
        assert_eq!(pr_title(&t), "#42: Add endpoint");

        t.title = "x".repeat(400);
        assert_eq!(commit_message(&t).chars().count(), 200);
        assert_eq!(pr_title(&t).chars().count(), 256);

        t.title = "  ".into();
        assert_eq!(commit_message(&t), "#42: Implement task");
    }

    #[test]
    fn pr_body_sections() {
        let body = pr_body(&task());
        assert!(body.contains("**Ticket:** #42"));
        assert!(body.contains("## Description"));
        assert!(body.contains("Expose GET /users"));
        assert!(body.contains("- returns 200"));
    }

    #[test]
    fn work_dir_strips_ticket_markers() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            settings_with_base(dir.path()),
            None,
            HostCredentials::default(),
        );
        let mut t = task();
        t.ticket_id = "#42".into();
        let path = pipeline.work_dir(&t, "abcd1234");
        assert!(path.ends_with("api_abcd1234_42"));

        t.ticket_id = "!7".into();
        assert!(pipeline.work_dir(&t, "abcd1234").ends_with("api_abcd1234_7"));
    }

    #[test]
    fn file_context_marks_new_and_missing_files() {
        use ticketsmith_kernel::plan::{PlanAction, PlanStep};

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("existing.py"), "x = 1\n").unwrap();
        let plan = ImplementationPlan {
            steps: vec![
                PlanStep {
                    path: "existing.py".into(),
                    action: PlanAction::Modify,
                    reason: "r".into(),
                },
                PlanStep {
                    path: "fresh.py".into(),
                    action: PlanAction::Create,
                    reason: "r".into(),
                },
                PlanStep {
                    path: "gone.py".into(),
                    action: PlanAction::Modify,
                    reason: "r".into(),
                },
            ],
            summary: String::new(),
        };
        let context = gather_file_contents(dir.path(), &plan);
        assert!(context.contains("### existing.py\nx = 1"));
        assert!(context.contains("### fresh.py (new)"));
        assert!(context.contains("### gone.py\n(file not found)"));
    }

    #[test]
    fn long_files_are_truncated_in_context() {
        let dir = tempfile::tempdir().unwrap();
        let long: String = (0..600).map(|i| format!("line {i}\n")).collect();
        std::fs::write(dir.path().join("big.py"), long).unwrap();
        let content = read_capped(dir.path(), "big.py");
        assert!(content.ends_with("... (truncated)"));
        assert!(content.contains("line 499"));
        assert!(!content.contains("line 500\n"));
    }

    #[tokio::test]
    async fn degraded_mode_stops_after_branch() {
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(root.path(), &[]).await;
        let base = root.path().join("ws");

        let pipeline = Pipeline::new(settings_with_base(&base), None, HostCredentials::default())
            .with_remote_url(remote);
        let report = pipeline.run(&task()).await;

        assert_eq!(report.status, RunStatus::CodegenDisabled);
        assert_eq!(report.branch.as_deref(), Some("ai/42-add-endpoint"));
        assert_eq!(report.attempts, 0);
        assert!(!report.validation_passed);
        // Workspace cleaned up.
        assert!(std::fs::read_dir(&base).map(|mut d| d.next().is_none()).unwrap_or(true));
    }

    #[tokio::test]
    async fn clone_failure_is_workspace_fault() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            settings_with_base(root.path()),
            None,
            HostCredentials::default(),
        )
        .with_remote_url(format!("file://{}/missing.git", root.path().display()));
        let report = pipeline.run(&task()).await;
        assert_eq!(report.status, RunStatus::WorkspaceFault);
        assert!(report.error.is_some());
        assert!(report.branch.is_none());
    }

    #[tokio::test]
    async fn trivial_validation_without_tokens_skips_delivery() {
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(root.path(), &[]).await;

        let model = Arc::new(ScriptedModel::new(&[
            "FILE: notes.txt\nACTION: create\nREASON: record notes\nSUMMARY: add notes",
            "EDIT_FILE: notes.txt\n```new\nhello\n```",
        ]));
        let pipeline = Pipeline::new(
            settings_with_base(&root.path().join("ws")),
            Some(model.clone()),
            HostCredentials::default(),
        )
        .with_remote_url(remote);
        let report = pipeline.run(&task()).await;

        assert_eq!(report.status, RunStatus::DeliverySkipped);
        assert!(report.validation_passed);
        assert_eq!(report.attempts, 1);
        assert!(report.pr_url.is_none());
        assert_eq!(model.feedback_requests(), 0);
    }

    #[tokio::test]
    async fn self_heal_retries_until_validation_passes() {
        let root = tempfile::tempdir().unwrap();
        // The repo's check demands a marker file the first edits never write.
        let remote = seed_origin(
            root.path(),
            &[("Makefile", "check-all: test\n\ntest:\n\t@cat fixed.marker\n")],
        )
        .await;

        let model = Arc::new(ScriptedModel::new(&[
            "FILE: notes.txt\nACTION: create\nREASON: notes\nSUMMARY: write notes",
            "EDIT_FILE: notes.txt\n```new\nwrong\n```",
            "EDIT_FILE: notes.txt\n```new\nstill wrong\n```",
            "EDIT_FILE: fixed.marker\n```new\ndone\n```",
        ]));
        let pipeline = Pipeline::new(
            settings_with_base(&root.path().join("ws")),
            Some(model.clone()),
            HostCredentials::default(),
        )
        .with_remote_url(remote);
        let report = pipeline.run(&task()).await;

        assert!(report.validation_passed, "error: {:?}", report.error);
        assert_eq!(report.status, RunStatus::DeliverySkipped);
        assert_eq!(report.attempts, 3);
        assert_eq!(model.feedback_requests(), 2);
    }

    #[tokio::test]
    async fn zero_retries_fails_after_one_attempt() {
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(
            root.path(),
            &[("Makefile", "test:\n\t@exit 1\n")],
        )
        .await;

        let model = Arc::new(ScriptedModel::new(&[
            "FILE: notes.txt\nACTION: create\nREASON: notes\nSUMMARY: write notes",
            "EDIT_FILE: notes.txt\n```new\nanything\n```",
        ]));
        let mut settings = settings_with_base(&root.path().join("ws"));
        settings.limits.max_validation_retries = 0;
        let pipeline = Pipeline::new(settings, Some(model.clone()), HostCredentials::default())
            .with_remote_url(remote);
        let report = pipeline.run(&task()).await;

        assert_eq!(report.status, RunStatus::ValidationFailed);
        assert!(!report.validation_passed);
        assert_eq!(report.attempts, 1);
        assert_eq!(model.feedback_requests(), 0);
        assert!(report.pr_url.is_none());
    }

    #[tokio::test]
    async fn end_to_end_delivery_creates_pull_request() {
        git_identity();
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(root.path(), &[]).await;

        let model = Arc::new(ScriptedModel::new(&[
            "FILE: a.py\nACTION: create\nREASON: new module\nSUMMARY: add module",
            "EDIT_FILE: a.py\n```new\nx = 1\n```",
        ]));
        let host = ScriptedHost::new(false);
        let pipeline = Pipeline::new(
            settings_with_base(&root.path().join("ws")),
            Some(model),
            github_credentials(),
        )
        .with_remote_url(remote)
        .with_host_factory(host.factory());
        let report = pipeline.run(&task()).await;

        assert_eq!(report.status, RunStatus::PrCreated, "error: {:?}", report.error);
        assert!(report.is_delivered());
        assert_eq!(report.branch.as_deref(), Some("ai/42-add-endpoint"));
        assert_eq!(report.pr_url.as_deref(), Some("https://example.com/pr/1"));
        assert!(report.validation_passed);

        let seen = host.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "#42: Add endpoint");
        assert_eq!(seen[0].head_branch, "ai/42-add-endpoint");
        assert_eq!(seen[0].base_branch, "main");
        assert_eq!(seen[0].reviewers, vec!["alice".to_string()]);
        assert_eq!(seen[0].labels, vec!["ai-generated".to_string()]);
        assert!(seen[0].body.contains("**Ticket:** #42"));

        // The branch really was pushed before the PR was opened.
        assert!(branch_in_origin(&root.path().join("origin.git"), "ai/42-add-endpoint").await);
    }

    #[tokio::test]
    async fn pr_failure_after_push_reports_committed() {
        git_identity();
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(root.path(), &[]).await;

        let model = Arc::new(ScriptedModel::new(&[
            "FILE: a.py\nACTION: create\nREASON: new module\nSUMMARY: add module",
            "EDIT_FILE: a.py\n```new\nx = 1\n```",
        ]));
        let host = ScriptedHost::new(true);
        let pipeline = Pipeline::new(
            settings_with_base(&root.path().join("ws")),
            Some(model),
            github_credentials(),
        )
        .with_remote_url(remote)
        .with_host_factory(host.factory());
        let report = pipeline.run(&task()).await;

        assert_eq!(report.status, RunStatus::Committed);
        assert!(!report.is_delivered());
        assert!(report.pr_url.is_none());
        assert!(report.error.as_deref().unwrap().contains("bad gateway"));
        assert!(branch_in_origin(&root.path().join("origin.git"), "ai/42-add-endpoint").await);
    }

    #[tokio::test]
    async fn exhausted_budget_reports_timeout() {
        let root = tempfile::tempdir().unwrap();
        let remote = seed_origin(root.path(), &[]).await;

        let mut settings = settings_with_base(&root.path().join("ws"));
        settings.limits.task_timeout_seconds = 0;
        let pipeline = Pipeline::new(settings, None, HostCredentials::default())
            .with_remote_url(remote);
        let report = pipeline.run(&task()).await;
        assert_eq!(report.status, RunStatus::TimedOut);
    }
}
