use std::path::Path;

use serde::{Deserialize, Serialize};
use ticketsmith_kernel::error::{Error, Result};

/// Full pipeline configuration.
///
/// Secrets (API keys, host tokens) are not part of this struct — they are
/// read from the environment by the llm/host crates so they never end up in
/// a config file or a serialized report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub workspace: WorkspaceConfig,
    pub limits: LimitsConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Base directory under which per-run clone workspaces are created.
    pub base_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Max self-healing retries; total implementation attempts = retries + 1.
    pub max_validation_retries: u32,
    /// Wall-clock budget for a whole run.
    pub task_timeout_seconds: u64,
    /// Timeout for each validation command.
    pub command_timeout_seconds: u64,
    /// Concurrent runs admitted by the scheduler.
    pub max_concurrent_runs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Label attached to agent-created PRs; empty disables labeling.
    pub pr_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                base_dir: "/tmp/ticketsmith_workspaces".into(),
            },
            limits: LimitsConfig {
                max_validation_retries: 5,
                task_timeout_seconds: 1800,
                command_timeout_seconds: 300,
                max_concurrent_runs: 4,
            },
            delivery: DeliveryConfig {
                pr_label: "ai-generated".into(),
            },
        }
    }
}

impl Settings {
    /// Load config with deep merge: built-in defaults + optional YAML
    /// overrides file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(path) = path {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("failed to read config: {e}")))?;

                // A YAML file with only comments parses to Null — skip then.
                let overrides: serde_yaml::Value = serde_yaml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("invalid config YAML: {e}")))?;

                if !overrides.is_null() {
                    let base: serde_yaml::Value = serde_yaml::to_value(&settings)
                        .map_err(|e| Error::Config(format!("failed to serialize defaults: {e}")))?;
                    let merged = deep_merge(base, overrides);
                    settings = serde_yaml::from_value(merged)
                        .map_err(|e| Error::Config(format!("failed to parse merged config: {e}")))?;
                }
            }
        }

        Ok(settings)
    }

    /// Per-command validation timeout, never exceeding the run budget.
    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.limits
                .command_timeout_seconds
                .min(self.limits.task_timeout_seconds),
        )
    }
}

/// Recursively merge override into base (override wins on conflict).
fn deep_merge(base: serde_yaml::Value, over: serde_yaml::Value) -> serde_yaml::Value {
    match (base, over) {
        (serde_yaml::Value::Mapping(mut base_map), serde_yaml::Value::Mapping(over_map)) => {
            for (key, over_val) in over_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, over_val)
                } else {
                    over_val
                };
                base_map.insert(key, merged);
            }
            serde_yaml::Value::Mapping(base_map)
        }
        (_, over) => over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_sane_values() {
        let settings = Settings::default();
        assert_eq!(settings.limits.max_validation_retries, 5);
        assert_eq!(settings.limits.task_timeout_seconds, 1800);
        assert_eq!(settings.delivery.pr_label, "ai-generated");
        assert!(settings.limits.max_concurrent_runs > 0);
    }

    #[test]
    fn load_without_file_returns_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.limits.max_validation_retries, 5);
    }

    #[test]
    fn load_with_nonexistent_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("missing.yaml"))).unwrap();
        assert_eq!(settings.limits.max_validation_retries, 5);
    }

    #[test]
    fn load_with_override_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "limits:\n  max_validation_retries: 2\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.limits.max_validation_retries, 2);
        // Non-overridden values keep defaults.
        assert_eq!(settings.limits.task_timeout_seconds, 1800);
    }

    #[test]
    fn load_with_comments_only_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "# limits:\n#   max_validation_retries: 1\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.limits.max_validation_retries, 5);
    }

    #[test]
    fn command_timeout_capped_by_run_budget() {
        let mut settings = Settings::default();
        settings.limits.command_timeout_seconds = 900;
        settings.limits.task_timeout_seconds = 300;
        assert_eq!(settings.command_timeout().as_secs(), 300);
    }
}
