use std::path::Path;

use anyhow::Result;
use ticketsmith_engine::validate;
use ticketsmith_engine::Settings;

pub async fn execute(repo: Option<&Path>, config: Option<&Path>) -> Result<()> {
    println!("ticketsmith status\n");

    println!("Credentials:");
    for key in ["ANTHROPIC_API_KEY", "GITHUB_TOKEN", "GITLAB_TOKEN"] {
        let available = std::env::var(key).is_ok_and(|v| !v.is_empty());
        let status = if available { "available" } else { "missing" };
        println!("  {key}: {status}");
    }
    println!();

    let settings = Settings::load(config)?;
    println!("Workspace:");
    println!("  base dir:           {}", settings.workspace.base_dir);
    println!();
    println!("Limits:");
    println!(
        "  validation retries: {}",
        settings.limits.max_validation_retries
    );
    println!(
        "  task timeout:       {}s",
        settings.limits.task_timeout_seconds
    );
    println!(
        "  command timeout:    {}s",
        settings.limits.command_timeout_seconds
    );
    println!(
        "  concurrent runs:    {}",
        settings.limits.max_concurrent_runs
    );
    println!();
    println!("Delivery:");
    println!("  pr label:           {}", settings.delivery.pr_label);

    if let Some(repo) = repo {
        let commands = validate::detect_commands(repo).await;
        let render = |cmd: &Option<Vec<String>>| match cmd {
            Some(parts) => parts.join(" "),
            None => "(none detected)".into(),
        };
        println!();
        println!("Validation commands for {}:", repo.display());
        println!("  lint: {}", render(&commands.lint));
        println!("  test: {}", render(&commands.test));
    }

    Ok(())
}
