//! Mock publisher for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::item::Item;
use crate::publisher::{PublishError, Publisher};

/// A recorded delivery attempt for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    /// The item that was submitted.
    pub item: Item,
    /// Whether the delivery succeeded.
    pub success: bool,
}

/// Mock implementation of the Publisher trait.
///
/// Records every delivery attempt and fails deliveries for configured
/// source ids.
#[derive(Debug)]
pub struct MockPublisher {
    deliveries: Arc<RwLock<Vec<RecordedDelivery>>>,
    failing_ids: Arc<RwLock<HashSet<String>>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self {
            deliveries: Arc::new(RwLock::new(Vec::new())),
            failing_ids: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Get all recorded delivery attempts.
    pub async fn recorded_deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.read().await.clone()
    }

    /// Source ids of successful deliveries, in delivery order.
    pub async fn delivered_ids(&self) -> Vec<String> {
        self.deliveries
            .read()
            .await
            .iter()
            .filter(|d| d.success)
            .map(|d| d.item.source_id.clone())
            .collect()
    }

    /// Number of delivery attempts, successful or not.
    pub async fn attempt_count(&self) -> usize {
        self.deliveries.read().await.len()
    }

    /// Make deliveries of `source_id` fail.
    pub async fn fail_on(&self, source_id: &str) {
        self.failing_ids.write().await.insert(source_id.to_string());
    }

    /// Let deliveries of `source_id` succeed again.
    pub async fn clear_failure(&self, source_id: &str) {
        self.failing_ids.write().await.remove(source_id);
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, ctx: &RunContext, item: &Item) -> Result<(), PublishError> {
        ctx.check()?;

        let fails = self.failing_ids.read().await.contains(&item.source_id);
        self.deliveries.write().await.push(RecordedDelivery {
            item: item.clone(),
            success: !fails,
        });

        if fails {
            return Err(PublishError::Service {
                status: Some(400),
                message: format!("mock failure for {}", item.source_id),
            });
        }
        Ok(())
    }
}
