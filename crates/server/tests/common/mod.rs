//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock collector, store, translator and publisher injected, so the
//! HTTP surface can be exercised without Reddit, OpenRouter or Telegram.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use newsbot_core::{
    load_config_from_str,
    testing::{MockCollector, MockItemStore, MockPublisher, MockTranslator},
    BatchTranslator, Collector, ItemStore, OrchestratorConfig, PipelineOrchestrator, Publisher,
    Translator,
};
use newsbot_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use newsbot_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[translation]
api_key = "sk-or-secret"
interval_ms = 5

[telegram]
bot_token = "123456:secret-token"
chat_id = -1001234567890

[orchestrator]
enabled = false
run_on_start = false
"#;

/// Test fixture for API testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub orchestrator: PipelineOrchestrator,
    pub collector: Arc<MockCollector>,
    pub store: Arc<MockItemStore>,
    pub translator: Arc<MockTranslator>,
    pub publisher: Arc<MockPublisher>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with a manual-only orchestrator.
    pub fn new() -> Self {
        let config = load_config_from_str(TEST_CONFIG).expect("test config parses");

        let collector = Arc::new(MockCollector::new());
        let store = Arc::new(MockItemStore::new());
        let translator = Arc::new(MockTranslator::new());
        let publisher = Arc::new(MockPublisher::new());

        let orchestrator = PipelineOrchestrator::new(
            OrchestratorConfig {
                enabled: false,
                run_on_start: false,
                ..Default::default()
            },
            Arc::clone(&collector) as Arc<dyn Collector>,
            Arc::clone(&store) as Arc<dyn ItemStore>,
            BatchTranslator::new(Arc::clone(&translator) as Arc<dyn Translator>)
                .with_interval(Duration::from_millis(5)),
            Arc::clone(&publisher) as Arc<dyn Publisher>,
        );

        let state = Arc::new(AppState::new(config, orchestrator.clone()));
        let router = create_router(state);

        Self {
            router,
            orchestrator,
            collector,
            store,
            translator,
            publisher,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
