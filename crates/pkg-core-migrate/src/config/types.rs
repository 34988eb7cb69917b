//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::PollerConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Managed package namespace prefix, without the `__` separator.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Deployment polling and retry budgets.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Source rewriting configuration.
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            migration: MigrationConfig::default(),
            deploy: DeployConfig::default(),
            rewrite: RewriteConfig::default(),
        }
    }
}

/// Migration run behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Restrict the run to these component types (names as accepted on the
    /// command line). Empty means all components.
    #[serde(default)]
    pub components: Vec<String>,

    /// Seconds to wait for an operator answer at a consent prompt.
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,

    /// Consent prompt attempts before the run aborts.
    #[serde(default = "default_prompt_attempts")]
    pub prompt_attempts: u32,

    /// Where to write the JSON run report. None disables the report file.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
            prompt_attempts: default_prompt_attempts(),
            report_path: None,
        }
    }
}

impl MigrationConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }
}

/// Deployment polling budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Seconds between status checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status checks per submission before timing out.
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,

    /// Submissions per deployment, counting the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Seconds to wait before resubmitting after a retryable failure.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: default_max_polls(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl DeployConfig {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

/// Source rewriting behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Directory holding the extension source files to rewrite.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Report edits and diffs without touching files.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_namespace() -> String {
    "vlocity_ins".to_string()
}

fn default_prompt_timeout_secs() -> u64 {
    300
}

fn default_prompt_attempts() -> u32 {
    3
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_polls() -> usize {
    20
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}
