//! Item storage trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextError, RunContext};
use crate::item::Item;

/// Error type for item store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Item not found.
    #[error("item not found: {0}")]
    NotFound(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// The run context finished before the operation completed.
    #[error("store operation interrupted: {0}")]
    Cancelled(#[from] ContextError),
}

/// Item counts used by the status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: u64,
    pub ready: u64,
    pub published: u64,
}

/// Durable keyed storage for items and their lifecycle flags.
///
/// Each operation is atomic and independent; there are no transactions
/// spanning several calls.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Whether an item with this source id was ever persisted.
    async fn exists(&self, ctx: &RunContext, source_id: &str) -> Result<bool, StoreError>;

    /// Insert the item, or update its content if the source id is known.
    ///
    /// `created_at` and `published_at` of an existing row are preserved.
    async fn upsert(&self, ctx: &RunContext, item: &Item) -> Result<(), StoreError>;

    /// Translated, unpublished items ordered by `created_at` ascending.
    async fn list_ready(&self, ctx: &RunContext) -> Result<Vec<Item>, StoreError>;

    /// Stamp `published_at` for the item.
    async fn mark_published(&self, ctx: &RunContext, source_id: &str) -> Result<(), StoreError>;

    /// Fetch a single item.
    async fn get(&self, ctx: &RunContext, source_id: &str) -> Result<Option<Item>, StoreError>;

    /// Aggregate counts.
    async fn stats(&self, ctx: &RunContext) -> Result<StoreStats, StoreError>;
}
