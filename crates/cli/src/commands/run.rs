use std::path::Path;

use anyhow::Result;
use ticketsmith_kernel::run::RunStatus;

use super::{build_pipeline, load_task};

pub async fn execute(
    task_path: &Path,
    config: Option<&Path>,
    remote_url: Option<String>,
) -> Result<()> {
    let task = load_task(task_path)?;
    let pipeline = build_pipeline(config, remote_url)?;

    let report = pipeline.run(&task).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.status {
        RunStatus::WorkspaceFault | RunStatus::ModelFault | RunStatus::TimedOut => {
            anyhow::bail!("run ended with status `{}`", report.status)
        }
        _ => Ok(()),
    }
}
