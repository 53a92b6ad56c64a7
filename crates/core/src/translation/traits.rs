//! Trait definitions for the translation module.

use async_trait::async_trait;

use super::TranslationError;
use crate::context::RunContext;

/// Known-good text used by health checks.
pub const HEALTH_CHECK_TEXT: &str = "Hello, world!";

/// A backend that translates one text into the configured target language.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name (e.g. "openrouter").
    fn name(&self) -> &str;

    /// Translate a single text.
    ///
    /// Fails with `EmptyInput` for blank text, `Service` when the backend
    /// reports failure and `EmptyResult` when it succeeds without content.
    async fn translate(&self, ctx: &RunContext, text: &str) -> Result<String, TranslationError>;

    /// Translate a fixed known-good string and report whether it worked.
    async fn health_check(&self, ctx: &RunContext) -> Result<(), TranslationError> {
        self.translate(ctx, HEALTH_CHECK_TEXT).await.map(|_| ())
    }
}
