//! Delivery of ready items to the destination channel.

mod telegram;

pub use telegram::{TelegramPublisher, TelegramPublisherConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, RunContext};
use crate::item::Item;

/// Errors that can occur while delivering an item.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The destination rejected the request.
    #[error("publish service error{}: {message}", status_suffix(.status))]
    Service { status: Option<u16>, message: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(String),

    /// The item has nothing to publish.
    #[error("item {0} has no translated content")]
    NotReady(String),

    /// The run context finished first.
    #[error("delivery interrupted: {0}")]
    Cancelled(#[from] ContextError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

/// Delivers one ready item to the destination.
///
/// Delivery is all-or-nothing per item: `Ok` means the destination accepted
/// the whole post.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Deliver `item`, using its translated body.
    async fn deliver(&self, ctx: &RunContext, item: &Item) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = PublishError::Service {
            status: Some(400),
            message: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "publish service error (status 400): Bad Request: chat not found"
        );

        let err = PublishError::Service {
            status: None,
            message: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "publish service error: nope");
    }
}
