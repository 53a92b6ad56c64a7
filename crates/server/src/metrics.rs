//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the newsbot server:
//! - HTTP request metrics (latency, counts)
//! - Orchestrator and item store status (collected dynamically)
//! - Core pipeline metrics registered from `newsbot_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "newsbot_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsbot_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "newsbot_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Scheduler state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "newsbot_orchestrator_running",
        "Whether the scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Whether a run is executing (1) or idle (0).
pub static RUN_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "newsbot_run_in_progress",
        "Whether a pipeline run is executing (1) or idle (0)",
    )
    .unwrap()
});

// =============================================================================
// Item Store Metrics (collected dynamically)
// =============================================================================

pub static ITEMS_STORED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("newsbot_items_stored", "Number of items in the item store").unwrap()
});

/// Items translated but not yet published.
pub static ITEMS_READY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "newsbot_items_ready",
        "Number of translated items waiting to be published",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(RUN_IN_PROGRESS.clone()))
        .unwrap();

    // Item store
    registry.register(Box::new(ITEMS_STORED.clone())).unwrap();
    registry.register(Box::new(ITEMS_READY.clone())).unwrap();

    // Core metrics (runs, items, external services)
    for metric in newsbot_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the orchestrator and store
/// at scrape time.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status().await;
    ORCHESTRATOR_RUNNING.set(i64::from(status.running));
    RUN_IN_PROGRESS.set(i64::from(status.run_in_progress));

    // Leave the store gauges untouched when the store could not be queried
    if let Some(stats) = status.store {
        ITEMS_STORED.set(stats.total as i64);
        ITEMS_READY.set(stats.ready as i64);
    }
}

static UUID_REGEX: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static NUMERIC_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = NUMERIC_REGEX.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/runs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/runs/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/items/12345";
        assert_eq!(normalize_path(path), "/api/v1/items/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        let path = "/api/v1/items/12345/media/2";
        assert_eq!(normalize_path(path), "/api/v1/items/{id}/media/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("newsbot_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs metrics that have been accessed
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        ORCHESTRATOR_RUNNING.set(0);
        RUN_IN_PROGRESS.set(0);
        ITEMS_STORED.set(0);
        ITEMS_READY.set(0);
        newsbot_core::metrics::ITEMS_COLLECTED.inc_by(0);

        let output = encode_metrics().unwrap();

        assert!(output.contains("newsbot_http_request_duration_seconds"));
        assert!(output.contains("newsbot_http_requests_in_flight"));
        assert!(output.contains("newsbot_orchestrator_running"));
        assert!(output.contains("newsbot_run_in_progress"));
        assert!(output.contains("newsbot_items_stored"));
        assert!(output.contains("newsbot_items_ready"));
        assert!(output.contains("newsbot_items_collected_total"));
    }
}
