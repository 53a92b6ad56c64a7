//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pipeline runs (outcome, duration)
//! - Items (collected, ingested, published, skipped)
//! - External services (Reddit, OpenRouter, Telegram)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Run Metrics
// =============================================================================

/// Pipeline runs total by result.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsbot_runs_total", "Total pipeline runs"),
        &["result"], // "success", "collect_failed", "list_ready_failed", "skipped"
    )
    .unwrap()
});

/// Pipeline run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "newsbot_run_duration_seconds",
            "Duration of a full pipeline run",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Item Metrics
// =============================================================================

/// Items returned by the collector.
pub static ITEMS_COLLECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("newsbot_items_collected_total", "Total items collected").unwrap()
});

/// Items translated and persisted.
pub static ITEMS_INGESTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "newsbot_items_ingested_total",
        "Total items translated and stored",
    )
    .unwrap()
});

/// Items delivered to the destination.
pub static ITEMS_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("newsbot_items_published_total", "Total items published").unwrap()
});

/// Item skips by reason.
pub static ITEM_SKIPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsbot_item_skips_total", "Total per-item skips"),
        &["reason"], // "existence_check", "translation", "persistence", "delivery", "mark_published"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "newsbot_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "newsbot_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        // Items
        Box::new(ITEMS_COLLECTED.clone()),
        Box::new(ITEMS_INGESTED.clone()),
        Box::new(ITEMS_PUBLISHED.clone()),
        Box::new(ITEM_SKIPS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
