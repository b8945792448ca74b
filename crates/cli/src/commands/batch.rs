use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ticketsmith_engine::idempotency::InMemoryAdmissions;
use ticketsmith_engine::{Scheduler, Settings, SubmitOutcome};

use super::{build_pipeline, load_task};

pub async fn execute(tasks_dir: &Path, config: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config)?;
    let pipeline = Arc::new(build_pipeline(config, None)?);
    let admissions = Arc::new(InMemoryAdmissions::new(Duration::from_secs(
        settings.limits.task_timeout_seconds,
    )));
    let scheduler = Scheduler::new(
        pipeline,
        admissions,
        settings.limits.max_concurrent_runs,
    );

    let mut entries: Vec<_> = std::fs::read_dir(tasks_dir)
        .with_context(|| format!("failed to read {}", tasks_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();
    if entries.is_empty() {
        println!("no task files in {}", tasks_dir.display());
        return Ok(());
    }

    let mut handles = Vec::new();
    for path in &entries {
        let task = load_task(path)?;
        match scheduler.submit(task) {
            SubmitOutcome::Accepted(handle) => handles.push(handle),
            SubmitOutcome::Duplicate => {
                println!("{}: duplicate of an in-flight run, skipped", path.display());
            }
        }
    }

    let mut delivered = 0usize;
    let total = handles.len();
    for handle in handles {
        let report = handle.await.context("run task panicked")?;
        println!(
            "{}  {}  attempts={}  pr={}",
            report.ticket_id,
            report.status,
            report.attempts,
            report.pr_url.as_deref().unwrap_or("-")
        );
        if report.is_delivered() {
            delivered += 1;
        }
    }
    println!("\n{delivered}/{total} runs delivered a pull request");
    Ok(())
}
