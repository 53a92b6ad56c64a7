//! Paced, fail-fast batch translation.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{TranslationError, Translator};
use crate::context::{ContextError, RunContext};

/// Default pause between consecutive translation calls.
pub const DEFAULT_TRANSLATION_INTERVAL: Duration = Duration::from_secs(1);

/// Sequences translation calls against a rate-limited backend.
///
/// The first call is issued immediately; every later call waits the
/// configured interval first. Waits observe the run context, so a cancelled
/// or expired run stops the batch before any further call is made.
#[derive(Clone)]
pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    interval: Duration,
}

impl BatchTranslator {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            interval: DEFAULT_TRANSLATION_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Translate a single text without pacing.
    pub async fn translate_one(
        &self,
        ctx: &RunContext,
        text: &str,
    ) -> Result<String, TranslationError> {
        self.translator.translate(ctx, text).await
    }

    /// Translate one text as call number `position` of a paced sequence.
    ///
    /// Every call after the first (`position > 0`) waits the interval before
    /// it is issued; a run that ends during the wait fails with `Cancelled`.
    pub async fn translate_paced(
        &self,
        ctx: &RunContext,
        text: &str,
        position: usize,
    ) -> Result<String, TranslationError> {
        self.pause_before(ctx, position).await?;
        self.translator.translate(ctx, text).await
    }

    async fn pause_before(&self, ctx: &RunContext, position: usize) -> Result<(), ContextError> {
        if position > 0 {
            ctx.sleep(self.interval).await?;
        }
        Ok(())
    }

    /// Translate `texts` in order.
    ///
    /// Empty input fails with `InvalidInput` before any call. The first
    /// failing element aborts the batch and partial results are dropped.
    pub async fn translate_batch(
        &self,
        ctx: &RunContext,
        texts: &[String],
    ) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Err(TranslationError::InvalidInput(
                "no texts to translate".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            self.pause_before(ctx, index).await?;

            debug!(index, total = texts.len(), "Translating batch element");
            let translated = self
                .translator
                .translate(ctx, text)
                .await
                .map_err(|source| TranslationError::Batch {
                    index,
                    source: Box::new(source),
                })?;
            results.push(translated);
        }

        Ok(results)
    }

    /// Run the backend's health check.
    pub async fn health_check(&self, ctx: &RunContext) -> Result<(), TranslationError> {
        self.translator.health_check(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTranslator;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_translate_batch_preserves_order() {
        let mock = Arc::new(MockTranslator::new());
        let batch = BatchTranslator::new(mock.clone()).with_interval(Duration::ZERO);

        let result = batch
            .translate_batch(&RunContext::background(), &texts(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(result, vec!["[ru] a", "[ru] b", "[ru] c"]);
        assert_eq!(mock.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_translate_batch_empty_input() {
        let mock = Arc::new(MockTranslator::new());
        let batch = BatchTranslator::new(mock.clone());

        let result = batch
            .translate_batch(&RunContext::background(), &[])
            .await;

        assert!(matches!(result, Err(TranslationError::InvalidInput(_))));
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_translate_batch_reports_failing_index() {
        let mock = Arc::new(MockTranslator::new());
        mock.fail_on("b").await;
        let batch = BatchTranslator::new(mock.clone()).with_interval(Duration::ZERO);

        let err = batch
            .translate_batch(&RunContext::background(), &texts(&["a", "b", "c"]))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::Batch { index: 1, .. }));
        assert_eq!(mock.translated_texts().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_translate_one_skips_pacing() {
        let mock = Arc::new(MockTranslator::new());
        let batch = BatchTranslator::new(mock.clone()).with_interval(Duration::from_secs(30));
        let ctx = RunContext::background();

        let started = std::time::Instant::now();
        batch.translate_one(&ctx, "a").await.unwrap();
        batch.translate_one(&ctx, "b").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_translate_paced_waits_after_first_call() {
        let mock = Arc::new(MockTranslator::new());
        let interval = Duration::from_millis(40);
        let batch = BatchTranslator::new(mock.clone()).with_interval(interval);
        let ctx = RunContext::background();

        batch.translate_paced(&ctx, "a", 0).await.unwrap();
        batch.translate_paced(&ctx, "b", 1).await.unwrap();

        let times = mock.call_times().await;
        assert_eq!(times.len(), 2);
        assert!(times[1].duration_since(times[0]) >= interval);
    }

    #[tokio::test]
    async fn test_translate_paced_cancelled_during_wait() {
        let mock = Arc::new(MockTranslator::new());
        let batch = BatchTranslator::new(mock.clone()).with_interval(Duration::from_secs(30));
        let ctx = RunContext::background();
        ctx.cancel();

        let err = batch.translate_paced(&ctx, "b", 1).await.unwrap_err();

        assert_eq!(err.context_error(), Some(ContextError::Cancelled));
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_health_check_uses_known_text() {
        let mock = Arc::new(MockTranslator::new());
        let batch = BatchTranslator::new(mock.clone());

        batch.health_check(&RunContext::background()).await.unwrap();
        assert_eq!(
            mock.translated_texts().await,
            vec![crate::translation::HEALTH_CHECK_TEXT]
        );
    }
}
