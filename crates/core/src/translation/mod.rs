//! Translation of item text into the target language.
//!
//! - [`Translator`]: single-text primitive, one backend per implementation
//! - [`BatchTranslator`]: ordered, paced, fail-fast sequences of calls
//! - [`OpenRouterTranslator`]: chat-completions backed translator

mod batch;
mod error;
mod openrouter;
mod traits;

pub use batch::{BatchTranslator, DEFAULT_TRANSLATION_INTERVAL};
pub use error::TranslationError;
pub use openrouter::{OpenRouterConfig, OpenRouterTranslator};
pub use traits::{Translator, HEALTH_CHECK_TEXT};
