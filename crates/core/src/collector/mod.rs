//! Source collectors producing candidate items for a run.

mod reddit;

pub use reddit::{RedditCollector, RedditCollectorConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, RunContext};
use crate::item::Item;

/// Errors that abort a whole collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Transport-level failure.
    #[error("failed to fetch {url}: {message}")]
    Http { url: String, message: String },

    /// The source answered with a non-success status.
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response could not be understood.
    #[error("failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    /// The run context finished first.
    #[error("collection interrupted: {0}")]
    Cancelled(#[from] ContextError),
}

/// Produces the complete set of candidate items for one run.
///
/// A fetch either returns every item or fails as a whole; it never returns
/// a partial result.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Collector name (e.g. "reddit").
    fn name(&self) -> &str;

    /// Fetch all candidate items, in source order.
    async fn fetch(&self, ctx: &RunContext) -> Result<Vec<Item>, CollectError>;
}
