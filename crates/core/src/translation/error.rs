//! Error types for the translation module.

use std::time::Duration;

use thiserror::Error;

use crate::context::ContextError;

/// Errors that can occur while translating.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Caller error, e.g. an empty batch. No call was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The text is blank after trimming. No call was attempted.
    #[error("text cannot be empty")]
    EmptyInput,

    /// The service answered with a non-success status or an embedded error.
    #[error("translation service error{}: {message}", status_suffix(.status))]
    Service { status: Option<u16>, message: String },

    /// The service succeeded but returned no usable translation.
    #[error("empty translation returned")]
    EmptyResult,

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(String),

    /// The request did not finish within the client timeout.
    #[error("translation timed out after {0:?}")]
    Timeout(Duration),

    /// One element of a batch failed; the batch was aborted.
    #[error("failed to translate text {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<TranslationError>,
    },

    /// The run context finished first.
    #[error("translation interrupted: {0}")]
    Cancelled(#[from] ContextError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl TranslationError {
    /// The context error behind this failure, looking through batch wrapping.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Cancelled(err) => Some(*err),
            Self::Batch { source, .. } => source.context_error(),
            _ => None,
        }
    }

    /// Whether the caller, rather than the service, is at fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::EmptyInput)
    }
}
