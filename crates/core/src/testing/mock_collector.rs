//! Mock collector for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::collector::{CollectError, Collector};
use crate::context::RunContext;
use crate::item::Item;

/// Mock implementation of the Collector trait.
///
/// Returns a configurable list of items on every fetch, or fails once with a
/// configured error.
#[derive(Debug)]
pub struct MockCollector {
    items: Arc<RwLock<Vec<Item>>>,
    next_error: Arc<RwLock<Option<CollectError>>>,
    fetch_count: Arc<RwLock<usize>>,
}

impl Default for MockCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCollector {
    /// Create a new mock collector returning no items.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            fetch_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Create a mock collector returning `items`.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            next_error: Arc::new(RwLock::new(None)),
            fetch_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Replace the items returned by subsequent fetches.
    pub async fn set_items(&self, items: Vec<Item>) {
        *self.items.write().await = items;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: CollectError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        *self.fetch_count.read().await
    }
}

#[async_trait]
impl Collector for MockCollector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, ctx: &RunContext) -> Result<Vec<Item>, CollectError> {
        ctx.check()?;
        *self.fetch_count.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.items.read().await.clone())
    }
}
