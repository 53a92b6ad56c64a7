//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait of
//! the pipeline, allowing orchestrator tests without network or database.
//!
//! # Example
//!
//! ```rust,ignore
//! use newsbot_core::testing::{fixtures, MockCollector, MockItemStore, MockPublisher, MockTranslator};
//!
//! let collector = MockCollector::with_items(vec![fixtures::item("a", 0)]);
//! let store = MockItemStore::new();
//! let translator = MockTranslator::new();
//! let publisher = MockPublisher::new();
//!
//! // Configure failures
//! store.fail_upsert_for("a").await;
//! publisher.fail_on("b").await;
//! ```

mod mock_collector;
mod mock_item_store;
mod mock_publisher;
mod mock_translator;

pub use mock_collector::MockCollector;
pub use mock_item_store::{MockItemStore, StoreCall};
pub use mock_publisher::{MockPublisher, RecordedDelivery};
pub use mock_translator::{MockTranslator, RecordedTranslation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::item::Item;

    /// Fixed reference time so ordering assertions are deterministic.
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// An untranslated item created `offset_secs` after [`base_time`].
    pub fn item(source_id: &str, offset_secs: i64) -> Item {
        Item::new(
            source_id,
            format!("Title {}", source_id),
            format!("Body of {}", source_id),
        )
        .with_created_at(base_time() + chrono::Duration::seconds(offset_secs))
    }

    /// A translated, unpublished item created `offset_secs` after [`base_time`].
    pub fn ready_item(source_id: &str, offset_secs: i64) -> Item {
        let item = item(source_id, offset_secs);
        let translated = format!("[ru] {}", item.body);
        item.with_translation(translated)
    }

    /// An untranslated item with one media URI.
    pub fn item_with_media(source_id: &str, offset_secs: i64, media: &str) -> Item {
        item(source_id, offset_secs).with_media(vec![media.to_string()])
    }
}
