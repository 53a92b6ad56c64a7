//! Mock translator for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::context::RunContext;
use crate::translation::{TranslationError, Translator};

/// A recorded translation call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranslation {
    /// The text that was submitted.
    pub text: String,
    /// When the call was issued.
    pub at: Instant,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Mock implementation of the Translator trait.
///
/// Provides controllable behavior for testing:
/// - Records every call with its issue time (for pacing assertions)
/// - Fails on configured input texts
/// - Optional per-call latency that observes the run context
///
/// Successful translations are `"[ru] <text>"`.
///
/// # Example
///
/// ```rust,ignore
/// use newsbot_core::testing::MockTranslator;
///
/// let translator = MockTranslator::new();
/// translator.fail_on("b").await;
///
/// let result = translator.translate(&ctx, "a").await?;
/// assert_eq!(result, "[ru] a");
/// ```
#[derive(Debug)]
pub struct MockTranslator {
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedTranslation>>>,
    /// Texts whose translation fails.
    failing_texts: Arc<RwLock<HashSet<String>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<TranslationError>>>,
    /// Simulated call latency.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranslator {
    /// Create a new mock translator.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failing_texts: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedTranslation> {
        self.calls.read().await.clone()
    }

    /// Get the number of calls issued.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Texts submitted for translation, in call order.
    pub async fn translated_texts(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .map(|c| c.text.clone())
            .collect()
    }

    /// Issue times of every call, in call order.
    pub async fn call_times(&self) -> Vec<Instant> {
        self.calls.read().await.iter().map(|c| c.at).collect()
    }

    /// Make every translation of `text` fail with a service error.
    pub async fn fail_on(&self, text: &str) {
        self.failing_texts.write().await.insert(text.to_string());
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: TranslationError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set simulated latency per call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, ctx: &RunContext, text: &str) -> Result<String, TranslationError> {
        ctx.check()?;

        let at = Instant::now();
        let result = if text.trim().is_empty() {
            Err(TranslationError::EmptyInput)
        } else if let Some(error) = self.next_error.write().await.take() {
            Err(error)
        } else if self.failing_texts.read().await.contains(text) {
            Err(TranslationError::Service {
                status: Some(500),
                message: format!("mock failure for {:?}", text),
            })
        } else {
            Ok(format!("[ru] {}", text))
        };

        self.calls.write().await.push(RecordedTranslation {
            text: text.to_string(),
            at,
            success: result.is_ok(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            ctx.sleep(delay).await?;
        }

        result
    }
}
