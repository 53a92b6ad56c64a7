//! Core item data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of source content moving through the pipeline.
///
/// Lifecycle: discovered by a collector (untranslated), persisted with a
/// translated body on first sighting, then marked published after a
/// confirmed delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier assigned by the source. The only deduplication key.
    pub source_id: String,
    pub title: String,
    /// Source-language text.
    pub body: String,
    /// Ordered media URIs, possibly empty.
    #[serde(default)]
    pub media_refs: Vec<String>,
    /// Empty until translation succeeds.
    #[serde(default)]
    pub translated_body: String,
    /// Set only after a confirmed delivery.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Written on first persistence and kept by later upserts.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create a freshly discovered, untranslated item.
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            body: body.into(),
            media_refs: Vec::new(),
            translated_body: String::new(),
            published_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_media(mut self, media_refs: Vec<String>) -> Self {
        self.media_refs = media_refs;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_translation(mut self, translated_body: impl Into<String>) -> Self {
        self.translated_body = translated_body.into();
        self
    }

    pub fn is_translated(&self) -> bool {
        !self.translated_body.is_empty()
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Translated and not yet published.
    pub fn is_ready(&self) -> bool {
        self.is_translated() && !self.is_published()
    }

    /// Text sent for translation: the body, or the title for link and media
    /// posts whose body is blank.
    pub fn translation_source(&self) -> &str {
        if self.body.trim().is_empty() {
            &self.title
        } else {
            &self.body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_not_ready() {
        let item = Item::new("abc", "Title", "Body");
        assert!(!item.is_translated());
        assert!(!item.is_published());
        assert!(!item.is_ready());
        assert!(item.media_refs.is_empty());
    }

    #[test]
    fn test_translated_item_is_ready() {
        let item = Item::new("abc", "Title", "Body").with_translation("Тело");
        assert!(item.is_ready());
    }

    #[test]
    fn test_published_item_is_not_ready() {
        let mut item = Item::new("abc", "Title", "Body").with_translation("Тело");
        item.published_at = Some(Utc::now());
        assert!(!item.is_ready());
    }

    #[test]
    fn test_translation_source_falls_back_to_title() {
        assert_eq!(Item::new("a", "Title", "Body").translation_source(), "Body");
        assert_eq!(Item::new("a", "Title", "  \n").translation_source(), "Title");
        assert_eq!(Item::new("a", "", "").translation_source(), "");
    }

    #[test]
    fn test_item_deserialize_defaults() {
        let json = r#"{
            "source_id": "x1",
            "title": "t",
            "body": "b",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.source_id, "x1");
        assert!(item.media_refs.is_empty());
        assert!(item.translated_body.is_empty());
        assert!(item.published_at.is_none());
    }
}
