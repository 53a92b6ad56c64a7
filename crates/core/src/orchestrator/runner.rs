//! Pipeline orchestrator implementation.
//!
//! One run is strictly sequential:
//! - Collect: one fetch, failure aborts the run
//! - Ingest: per item existence check, translation, upsert
//! - Publish: list ready items, deliver, mark published
//!
//! Per-item failures are logged and counted; the item is retried on a later run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collector::Collector;
use crate::context::RunContext;
use crate::item::{Item, ItemStore};
use crate::metrics;
use crate::publisher::Publisher;
use crate::translation::BatchTranslator;

use super::config::OrchestratorConfig;
use super::types::{
    OrchestratorStatus, PipelineError, RunOutcome, RunReport, RunSummary, SkipReason,
};

/// Bound on status queries against the store.
const STATUS_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The pipeline orchestrator - moves items from the collector to the publisher.
///
/// Cheap to clone; clones share collaborators and runtime state.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    config: OrchestratorConfig,
    collector: Arc<dyn Collector>,
    store: Arc<dyn ItemStore>,
    translator: BatchTranslator,
    publisher: Arc<dyn Publisher>,

    // Runtime state
    running: Arc<AtomicBool>,
    run_in_progress: Arc<AtomicBool>,
    runs_completed: Arc<AtomicU64>,
    current_run: Arc<RwLock<Option<RunContext>>>,
    last_run: Arc<RwLock<Option<RunReport>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        collector: Arc<dyn Collector>,
        store: Arc<dyn ItemStore>,
        translator: BatchTranslator,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            collector,
            store,
            translator,
            publisher,
            running: Arc::new(AtomicBool::new(false)),
            run_in_progress: Arc::new(AtomicBool::new(false)),
            runs_completed: Arc::new(AtomicU64::new(0)),
            current_run: Arc::new(RwLock::new(None)),
            last_run: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn translator(&self) -> &BatchTranslator {
        &self.translator
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn is_run_in_progress(&self) -> bool {
        self.run_in_progress.load(Ordering::SeqCst)
    }

    /// Execute one full pipeline run under `ctx`.
    ///
    /// Returns an error only when a whole stage fails (collect or list-ready).
    /// Per-item failures are skips and show up in the summary counters.
    pub async fn run_pipeline(&self, ctx: &RunContext) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();
        self.execute(ctx, &mut summary).await?;
        Ok(summary)
    }

    /// Run the pipeline once with a fresh deadline-bound context.
    ///
    /// Returns `AlreadyRunning` without touching any collaborator if another
    /// run is in flight. The report is also kept as the last run.
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        if self.run_in_progress.swap(true, Ordering::SeqCst) {
            warn!("Pipeline run already in progress, skipping");
            metrics::RUNS_TOTAL
                .with_label_values(&[PipelineError::AlreadyRunning.label()])
                .inc();
            return Err(PipelineError::AlreadyRunning);
        }
        let _guard = RunGuard(Arc::clone(&self.run_in_progress));

        let ctx = RunContext::with_deadline_in(self.config.run_timeout());
        *self.current_run.write().await = Some(ctx.clone());

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let timer = std::time::Instant::now();
        info!(run_id = %run_id, "Pipeline run started");

        let mut summary = RunSummary::default();
        let result = self.execute(&ctx, &mut summary).await;

        *self.current_run.write().await = None;

        let label = match &result {
            Ok(()) => "success",
            Err(e) => e.label(),
        };
        metrics::RUNS_TOTAL.with_label_values(&[label]).inc();
        metrics::RUN_DURATION
            .with_label_values(&[label])
            .observe(timer.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(()) => {
                info!(
                    run_id = %run_id,
                    collected = summary.collected,
                    ingested = summary.ingested,
                    published = summary.published,
                    skipped = summary.skipped.total(),
                    "Pipeline run completed"
                );
                RunOutcome::Succeeded
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Pipeline run failed");
                RunOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcome,
            summary,
        };
        *self.last_run.write().await = Some(report.clone());
        self.runs_completed.fetch_add(1, Ordering::Relaxed);

        result.map(|()| report)
    }

    /// Start the periodic scheduler (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!(
            interval_secs = self.config.run_interval_secs,
            run_on_start = self.config.run_on_start,
            "Starting pipeline orchestrator"
        );

        self.spawn_schedule_loop();
    }

    /// Stop the scheduler and cancel the run in flight, if any.
    ///
    /// A run triggered on demand is cancelled too, whether or not the
    /// scheduler was started.
    pub async fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if was_running {
            info!("Stopping pipeline orchestrator");
            // Signal shutdown to the schedule loop
            let _ = self.shutdown_tx.send(());
        }

        let cancelled = match self.current_run.read().await.as_ref() {
            Some(ctx) => {
                info!("Cancelling run in progress");
                ctx.cancel();
                true
            }
            None => false,
        };

        if !was_running && !cancelled {
            warn!("Orchestrator not running");
            return;
        }

        // Give the cancelled run a moment to unwind
        for _ in 0..50 {
            if !self.is_run_in_progress() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        info!("Pipeline orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let ctx = RunContext::with_deadline_in(STATUS_QUERY_TIMEOUT);
        let store = match self.store.stats(&ctx).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Failed to query store statistics: {}", e);
                None
            }
        };

        OrchestratorStatus {
            running: self.is_running(),
            run_in_progress: self.is_run_in_progress(),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            last_run: self.last_run.read().await.clone(),
            store,
        }
    }

    /// The report of the most recent finished run.
    pub async fn last_run(&self) -> Option<RunReport> {
        self.last_run.read().await.clone()
    }

    /// Spawn the schedule loop task.
    fn spawn_schedule_loop(&self) {
        let this = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Schedule loop started");

            if this.config.run_on_start {
                this.run_scheduled().await;
            }

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Schedule loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(this.config.run_interval()) => {
                        if !this.running.load(Ordering::Relaxed) {
                            break;
                        }
                        this.run_scheduled().await;
                    }
                }
            }

            info!("Schedule loop stopped");
        });
    }

    async fn run_scheduled(&self) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }
        match self.run_once().await {
            Ok(_) => {}
            Err(PipelineError::AlreadyRunning) => {
                debug!("Scheduled run skipped, previous run still in progress");
            }
            // Already logged by run_once; the next tick retries.
            Err(_) => {}
        }
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        // Stage 1: collect
        info!(collector = self.collector.name(), "Fetching items");
        let items = self.collector.fetch(ctx).await.map_err(|e| {
            error!(error = %e, "Failed to fetch items");
            PipelineError::Collect(e)
        })?;
        summary.collected = items.len();
        metrics::ITEMS_COLLECTED.inc_by(items.len() as u64);
        info!(count = items.len(), "Fetched items");

        // Stage 2: filter new items and translate them
        self.ingest(ctx, items, summary).await;
        info!(
            ingested = summary.ingested,
            already_seen = summary.already_seen,
            "Processed new items"
        );

        // Stage 3: publish ready items
        info!(publisher = self.publisher.name(), "Publishing ready items");
        let ready = self.store.list_ready(ctx).await.map_err(|e| {
            error!(error = %e, "Failed to list ready items");
            PipelineError::ListReady(e)
        })?;
        debug!(count = ready.len(), "Listed ready items");

        self.publish(ctx, ready, summary).await;
        info!(published = summary.published, "Publishing finished");

        Ok(())
    }

    async fn ingest(&self, ctx: &RunContext, items: Vec<Item>, summary: &mut RunSummary) {
        let total = items.len();
        let mut translation_calls = 0usize;

        for (position, mut item) in items.into_iter().enumerate() {
            if let Some(err) = ctx.err() {
                warn!(
                    remaining = total - position,
                    "Run context finished ({}), leaving remaining items for the next run", err
                );
                return;
            }

            match self.store.exists(ctx, &item.source_id).await {
                Ok(true) => {
                    summary.already_seen += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    self.skip(summary, SkipReason::ExistenceCheck, &item.source_id, &e);
                    continue;
                }
            }

            // Without pacing every call counts as the first of its sequence
            let position = if self.config.pace_translations {
                translation_calls
            } else {
                0
            };
            translation_calls += 1;

            debug!(source_id = %item.source_id, title = %item.title, "Translating item");
            let translated = self
                .translator
                .translate_paced(ctx, item.translation_source(), position)
                .await;
            match translated {
                Ok(translated) => item.translated_body = translated,
                Err(e) => {
                    self.skip(summary, SkipReason::Translation, &item.source_id, &e);
                    continue;
                }
            }

            if let Err(e) = self.store.upsert(ctx, &item).await {
                self.skip(summary, SkipReason::Persistence, &item.source_id, &e);
                continue;
            }

            summary.ingested += 1;
            metrics::ITEMS_INGESTED.inc();
        }
    }

    async fn publish(&self, ctx: &RunContext, ready: Vec<Item>, summary: &mut RunSummary) {
        let total = ready.len();

        for (position, item) in ready.into_iter().enumerate() {
            if let Some(err) = ctx.err() {
                warn!(
                    remaining = total - position,
                    "Run context finished ({}), leaving remaining items for the next run", err
                );
                return;
            }

            if let Err(e) = self.publisher.deliver(ctx, &item).await {
                self.skip(summary, SkipReason::Delivery, &item.source_id, &e);
                continue;
            }

            if let Err(e) = self.store.mark_published(ctx, &item.source_id).await {
                // Delivered but still listed as ready: it goes out again next run.
                error!(
                    source_id = %item.source_id,
                    error = %e,
                    "Item delivered but not marked published"
                );
                summary.skipped.record(SkipReason::MarkPublished);
                metrics::ITEM_SKIPS
                    .with_label_values(&[SkipReason::MarkPublished.as_str()])
                    .inc();
                continue;
            }

            summary.published += 1;
            metrics::ITEMS_PUBLISHED.inc();
            info!(source_id = %item.source_id, title = %item.title, "Published item");
        }
    }

    fn skip(
        &self,
        summary: &mut RunSummary,
        reason: SkipReason,
        source_id: &str,
        error: &dyn std::fmt::Display,
    ) {
        warn!(
            source_id = %source_id,
            reason = reason.as_str(),
            error = %error,
            "Skipping item"
        );
        summary.skipped.record(reason);
        metrics::ITEM_SKIPS
            .with_label_values(&[reason.as_str()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockCollector, MockItemStore, MockPublisher, MockTranslator};

    fn orchestrator(
        items: Vec<Item>,
    ) -> (
        PipelineOrchestrator,
        Arc<MockItemStore>,
        Arc<MockTranslator>,
        Arc<MockPublisher>,
    ) {
        let store = Arc::new(MockItemStore::new());
        let translator = Arc::new(MockTranslator::new());
        let publisher = Arc::new(MockPublisher::new());
        let orchestrator = PipelineOrchestrator::new(
            OrchestratorConfig {
                pace_translations: false,
                ..OrchestratorConfig::default()
            },
            Arc::new(MockCollector::with_items(items)),
            store.clone(),
            BatchTranslator::new(translator.clone()).with_interval(Duration::ZERO),
            publisher.clone(),
        );
        (orchestrator, store, translator, publisher)
    }

    #[tokio::test]
    async fn test_run_pipeline_happy_path() {
        let (orchestrator, store, translator, publisher) =
            orchestrator(vec![fixtures::item("a", 0), fixtures::item("b", 1)]);

        let summary = orchestrator
            .run_pipeline(&RunContext::background())
            .await
            .unwrap();

        assert_eq!(summary.collected, 2);
        assert_eq!(summary.ingested, 2);
        assert_eq!(summary.published, 2);
        assert_eq!(summary.skipped.total(), 0);
        assert_eq!(translator.call_count().await, 2);
        assert_eq!(publisher.delivered_ids().await, vec!["a", "b"]);

        let stored = store.item("a").await.unwrap();
        assert_eq!(stored.translated_body, "[ru] Body of a");
        assert!(stored.is_published());
    }

    #[tokio::test]
    async fn test_run_once_records_report() {
        let (orchestrator, _, _, _) = orchestrator(vec![fixtures::item("a", 0)]);

        let report = orchestrator.run_once().await.unwrap();
        assert!(report.succeeded());
        assert_eq!(report.summary.published, 1);
        assert!(!orchestrator.is_run_in_progress());

        let status = orchestrator.status().await;
        assert_eq!(status.runs_completed, 1);
        assert_eq!(status.last_run.unwrap().run_id, report.run_id);
        assert_eq!(status.store.unwrap().published, 1);
    }

    #[tokio::test]
    async fn test_run_once_refuses_overlap() {
        let (orchestrator, store, _, _) = orchestrator(vec![fixtures::item("a", 0)]);
        orchestrator.run_in_progress.store(true, Ordering::SeqCst);

        let result = orchestrator.run_once().await;
        assert!(matches!(result, Err(PipelineError::AlreadyRunning)));
        assert_eq!(store.call_count().await, 0);
        assert!(orchestrator.last_run().await.is_none());
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (orchestrator, _, _, publisher) = orchestrator(vec![fixtures::item("a", 0)]);

        orchestrator.start().await;
        assert!(orchestrator.is_running());

        // run_on_start fires immediately
        for _ in 0..50 {
            if orchestrator.last_run().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(publisher.delivered_ids().await, vec!["a"]);

        orchestrator.stop().await;
        assert!(!orchestrator.is_running());
        assert!(!orchestrator.status().await.running);
    }
}
