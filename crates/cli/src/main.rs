use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ticketsmith",
    about = "Turns tickets into validated pull requests",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a single task
    Run {
        /// Path to a task JSON file
        task: PathBuf,

        /// Path to a config YAML file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the computed clone URL
        #[arg(long)]
        remote_url: Option<String>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Run every task JSON file in a directory, concurrently
    Batch {
        /// Directory containing task JSON files
        tasks_dir: PathBuf,

        /// Path to a config YAML file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Check credentials, config, and detected validation commands
    Status {
        /// Repository to probe for lint/test conventions (optional)
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Path to a config YAML file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            config,
            remote_url,
            verbose,
        } => {
            commands::setup_logging(verbose);
            commands::run::execute(&task, config.as_deref(), remote_url).await
        }
        Commands::Batch {
            tasks_dir,
            config,
            verbose,
        } => {
            commands::setup_logging(verbose);
            commands::batch::execute(&tasks_dir, config.as_deref()).await
        }
        Commands::Status { repo, config } => {
            commands::status::execute(repo.as_deref(), config.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_app() {
        Cli::command().debug_assert();
    }
}
