//! Types for the pipeline orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::CollectError;
use crate::context::ContextError;
use crate::item::{StoreError, StoreStats};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The collector failed; nothing else ran.
    #[error("collect stage failed: {0}")]
    Collect(#[source] CollectError),

    /// Ready items could not be listed; ingestion already happened.
    #[error("list-ready stage failed: {0}")]
    ListReady(#[source] StoreError),

    /// Another run is in flight.
    #[error("a pipeline run is already in progress")]
    AlreadyRunning,
}

impl PipelineError {
    /// The context error behind a stage failure, if the run was cancelled or timed out.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Collect(CollectError::Cancelled(err)) => Some(*err),
            Self::ListReady(StoreError::Cancelled(err)) => Some(*err),
            _ => None,
        }
    }

    /// Metric label for the run outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Collect(_) => "collect_failed",
            Self::ListReady(_) => "list_ready_failed",
            Self::AlreadyRunning => "skipped",
        }
    }
}

/// Why a single item was skipped. Skips are logged and counted, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ExistenceCheck,
    Translation,
    Persistence,
    Delivery,
    MarkPublished,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExistenceCheck => "existence_check",
            Self::Translation => "translation",
            Self::Persistence => "persistence",
            Self::Delivery => "delivery",
            Self::MarkPublished => "mark_published",
        }
    }
}

/// Per-reason skip counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub existence_check: usize,
    pub translation: usize,
    pub persistence: usize,
    pub delivery: usize,
    pub mark_published: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::ExistenceCheck => self.existence_check += 1,
            SkipReason::Translation => self.translation += 1,
            SkipReason::Persistence => self.persistence += 1,
            SkipReason::Delivery => self.delivery += 1,
            SkipReason::MarkPublished => self.mark_published += 1,
        }
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::ExistenceCheck => self.existence_check,
            SkipReason::Translation => self.translation,
            SkipReason::Persistence => self.persistence,
            SkipReason::Delivery => self.delivery,
            SkipReason::MarkPublished => self.mark_published,
        }
    }

    pub fn total(&self) -> usize {
        self.existence_check + self.translation + self.persistence + self.delivery + self.mark_published
    }
}

/// Counters for one run. Observational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items returned by the collector.
    pub collected: usize,
    /// Items skipped because their source id was already stored.
    pub already_seen: usize,
    /// Items translated and persisted.
    pub ingested: usize,
    /// Items delivered and marked published.
    pub published: usize,
    pub skipped: SkipCounts,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed { error: String },
}

/// Record of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    /// Counters gathered before the run ended, also for failed runs.
    pub summary: RunSummary,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the scheduler loop is running.
    pub running: bool,
    /// Whether a run is executing right now.
    pub run_in_progress: bool,
    /// Runs finished since startup, successful or not.
    pub runs_completed: u64,
    pub last_run: Option<RunReport>,
    /// Item counts, absent if the store could not be queried.
    pub store: Option<StoreStats>,
}
