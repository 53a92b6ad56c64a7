//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the periodic scheduler.
    /// When disabled, runs must be triggered manually via API.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run the pipeline immediately when the scheduler starts.
    #[serde(default = "default_true")]
    pub run_on_start: bool,

    /// Pause between scheduled runs (seconds).
    #[serde(default = "default_run_interval")]
    pub run_interval_secs: u64,

    /// Deadline for a single run (seconds).
    /// Every outbound call and pacing wait observes it.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Space per-item translation calls by the translation interval.
    #[serde(default = "default_true")]
    pub pace_translations: bool,
}

fn default_true() -> bool {
    true
}

fn default_run_interval() -> u64 {
    3600 // 1 hour
}

fn default_run_timeout() -> u64 {
    1800 // 30 minutes
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_start: true,
            run_interval_secs: default_run_interval(),
            run_timeout_secs: default_run_timeout(),
            pace_translations: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}
