//! Pipeline orchestrator.
//!
//! The orchestrator sequences one run end to end:
//! - **Collect**: one fetch from the collector, failure aborts the run
//! - **Ingest**: new items are translated, then persisted
//! - **Publish**: ready items are delivered in `created_at` order, then marked
//!
//! Around a single run it provides a skip-if-running guard (`run_once`) and a
//! periodic scheduler (`start`/`stop`).

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::PipelineOrchestrator;
pub use types::{
    OrchestratorStatus, PipelineError, RunOutcome, RunReport, RunSummary, SkipCounts, SkipReason,
};
