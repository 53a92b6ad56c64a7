//! In-memory item store for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::item::{Item, ItemStore, StoreError, StoreStats};

/// A store operation, recorded in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Exists(String),
    Upsert(String),
    ListReady,
    MarkPublished(String),
    Get(String),
    Stats,
}

#[derive(Debug, Default)]
struct Failures {
    exists: HashSet<String>,
    upsert: HashSet<String>,
    mark_published: HashSet<String>,
    list_ready: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Items with their insertion sequence, used as ordering tie-breaker.
    items: HashMap<String, (u64, Item)>,
    next_seq: u64,
}

/// Mock implementation of the ItemStore trait.
///
/// Same semantics as the SQLite store, plus a call log and per-operation
/// failure injection keyed by source id.
#[derive(Debug)]
pub struct MockItemStore {
    state: Arc<RwLock<State>>,
    calls: Arc<RwLock<Vec<StoreCall>>>,
    failures: Arc<RwLock<Failures>>,
}

impl Default for MockItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(Failures::default())),
        }
    }

    /// Insert an item directly, bypassing the call log and failure injection.
    pub async fn seed(&self, item: Item) {
        let mut state = self.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.items.insert(item.source_id.clone(), (seq, item));
    }

    /// Snapshot of a stored item.
    pub async fn item(&self, source_id: &str) -> Option<Item> {
        self.state
            .read()
            .await
            .items
            .get(source_id)
            .map(|(_, item)| item.clone())
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All recorded calls.
    pub async fn recorded_calls(&self) -> Vec<StoreCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Make `exists` fail for `source_id`.
    pub async fn fail_exists_for(&self, source_id: &str) {
        self.failures.write().await.exists.insert(source_id.to_string());
    }

    /// Make `upsert` fail for `source_id`.
    pub async fn fail_upsert_for(&self, source_id: &str) {
        self.failures.write().await.upsert.insert(source_id.to_string());
    }

    /// Make `mark_published` fail for `source_id`.
    pub async fn fail_mark_published_for(&self, source_id: &str) {
        self.failures
            .write()
            .await
            .mark_published
            .insert(source_id.to_string());
    }

    /// Make every `list_ready` call fail.
    pub async fn fail_list_ready(&self, fail: bool) {
        self.failures.write().await.list_ready = fail;
    }

    /// Remove every configured failure.
    pub async fn clear_failures(&self) {
        *self.failures.write().await = Failures::default();
    }

    async fn record(&self, call: StoreCall) {
        self.calls.write().await.push(call);
    }

    fn injected(op: &str, source_id: &str) -> StoreError {
        StoreError::Database(format!("mock {} failure for {}", op, source_id))
    }
}

#[async_trait]
impl ItemStore for MockItemStore {
    async fn exists(&self, ctx: &RunContext, source_id: &str) -> Result<bool, StoreError> {
        ctx.check()?;
        self.record(StoreCall::Exists(source_id.to_string())).await;

        if self.failures.read().await.exists.contains(source_id) {
            return Err(Self::injected("exists", source_id));
        }
        Ok(self.state.read().await.items.contains_key(source_id))
    }

    async fn upsert(&self, ctx: &RunContext, item: &Item) -> Result<(), StoreError> {
        ctx.check()?;
        self.record(StoreCall::Upsert(item.source_id.clone())).await;

        if self.failures.read().await.upsert.contains(&item.source_id) {
            return Err(Self::injected("upsert", &item.source_id));
        }

        let mut state = self.state.write().await;
        if let Some((_, existing)) = state.items.get_mut(&item.source_id) {
            existing.title = item.title.clone();
            existing.body = item.body.clone();
            existing.media_refs = item.media_refs.clone();
            existing.translated_body = item.translated_body.clone();
        } else {
            let seq = state.next_seq;
            state.next_seq += 1;
            state
                .items
                .insert(item.source_id.clone(), (seq, item.clone()));
        }
        Ok(())
    }

    async fn list_ready(&self, ctx: &RunContext) -> Result<Vec<Item>, StoreError> {
        ctx.check()?;
        self.record(StoreCall::ListReady).await;

        if self.failures.read().await.list_ready {
            return Err(StoreError::Database("mock list_ready failure".to_string()));
        }

        let state = self.state.read().await;
        let mut ready: Vec<&(u64, Item)> =
            state.items.values().filter(|(_, item)| item.is_ready()).collect();
        ready.sort_by(|(a_seq, a), (b_seq, b)| {
            a.created_at.cmp(&b.created_at).then(a_seq.cmp(b_seq))
        });
        Ok(ready.into_iter().map(|(_, item)| item.clone()).collect())
    }

    async fn mark_published(&self, ctx: &RunContext, source_id: &str) -> Result<(), StoreError> {
        ctx.check()?;
        self.record(StoreCall::MarkPublished(source_id.to_string()))
            .await;

        if self.failures.read().await.mark_published.contains(source_id) {
            return Err(Self::injected("mark_published", source_id));
        }

        let mut state = self.state.write().await;
        match state.items.get_mut(source_id) {
            Some((_, item)) => {
                if item.published_at.is_none() {
                    item.published_at = Some(Utc::now());
                }
                Ok(())
            }
            None => Err(StoreError::NotFound(source_id.to_string())),
        }
    }

    async fn get(&self, ctx: &RunContext, source_id: &str) -> Result<Option<Item>, StoreError> {
        ctx.check()?;
        self.record(StoreCall::Get(source_id.to_string())).await;
        Ok(self.item(source_id).await)
    }

    async fn stats(&self, ctx: &RunContext) -> Result<StoreStats, StoreError> {
        ctx.check()?;
        self.record(StoreCall::Stats).await;

        let state = self.state.read().await;
        let mut stats = StoreStats::default();
        for (_, item) in state.items.values() {
            stats.total += 1;
            if item.is_ready() {
                stats.ready += 1;
            }
            if item.is_published() {
                stats.published += 1;
            }
        }
        Ok(stats)
    }
}
