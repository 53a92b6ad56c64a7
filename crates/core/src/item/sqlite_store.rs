//! SQLite-backed item store implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Item, ItemStore, StoreError, StoreStats};
use crate::context::RunContext;

const ITEM_COLUMNS: &str =
    "source_id, title, body, media_refs, translated_body, published_at, created_at";

/// SQLite-backed item store.
///
/// Blocking SQLite calls run on tokio's blocking pool. When the run context
/// finishes first the caller gets `StoreError::Cancelled`; a statement that
/// already started still runs to completion on its own.
pub struct SqliteItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteItemStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                source_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                media_refs TEXT NOT NULL DEFAULT '[]',
                translated_body TEXT NOT NULL DEFAULT '',
                published_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_ready
                ON items(published_at, created_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Run a blocking closure against the connection, bound to the context.
    async fn with_conn<T, F>(&self, ctx: &RunContext, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        ctx.run(async move {
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().unwrap();
                f(&conn)
            })
            .await
            .map_err(|e| StoreError::Database(format!("blocking task failed: {}", e)))?
        })
        .await
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        let media_json: String = row.get(3)?;
        let published_at: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;

        Ok(Item {
            source_id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            media_refs: serde_json::from_str(&media_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            translated_body: row.get(4)?,
            published_at: published_at
                .map(|ts| parse_timestamp(5, &ts))
                .transpose()?,
            created_at: parse_timestamp(6, &created_at)?,
        })
    }
}

/// Fixed-width UTC timestamps so that lexical order matches chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn exists(&self, ctx: &RunContext, source_id: &str) -> Result<bool, StoreError> {
        let source_id = source_id.to_string();
        self.with_conn(ctx, move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE source_id = ?)",
                params![source_id],
                |row| row.get::<_, bool>(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))
        })
        .await
    }

    async fn upsert(&self, ctx: &RunContext, item: &Item) -> Result<(), StoreError> {
        let item = item.clone();
        self.with_conn(ctx, move |conn| {
            let media_json = serde_json::to_string(&item.media_refs)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            conn.execute(
                r#"
                INSERT INTO items (source_id, title, body, media_refs, translated_body, published_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(source_id) DO UPDATE SET
                    title = excluded.title,
                    body = excluded.body,
                    media_refs = excluded.media_refs,
                    translated_body = excluded.translated_body
                "#,
                params![
                    item.source_id,
                    item.title,
                    item.body,
                    media_json,
                    item.translated_body,
                    item.published_at.as_ref().map(format_timestamp),
                    format_timestamp(&item.created_at),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn list_ready(&self, ctx: &RunContext) -> Result<Vec<Item>, StoreError> {
        self.with_conn(ctx, |conn| {
            let sql = format!(
                "SELECT {} FROM items WHERE published_at IS NULL AND translated_body != '' ORDER BY created_at ASC, rowid ASC",
                ITEM_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let rows = stmt
                .query_map([], Self::row_to_item)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
            }
            Ok(items)
        })
        .await
    }

    async fn mark_published(&self, ctx: &RunContext, source_id: &str) -> Result<(), StoreError> {
        let source_id = source_id.to_string();
        self.with_conn(ctx, move |conn| {
            let now = format_timestamp(&Utc::now());
            let updated = conn
                .execute(
                    "UPDATE items SET published_at = COALESCE(published_at, ?) WHERE source_id = ?",
                    params![now, source_id],
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;

            if updated == 0 {
                return Err(StoreError::NotFound(source_id));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, ctx: &RunContext, source_id: &str) -> Result<Option<Item>, StoreError> {
        let source_id = source_id.to_string();
        self.with_conn(ctx, move |conn| {
            let sql = format!("SELECT {} FROM items WHERE source_id = ?", ITEM_COLUMNS);
            conn.query_row(&sql, params![source_id], Self::row_to_item)
                .optional()
                .map_err(|e| StoreError::Database(e.to_string()))
        })
        .await
    }

    async fn stats(&self, ctx: &RunContext) -> Result<StoreStats, StoreError> {
        self.with_conn(ctx, |conn| {
            conn.query_row(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN published_at IS NULL AND translated_body != '' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN published_at IS NOT NULL THEN 1 ELSE 0 END), 0)
                FROM items
                "#,
                [],
                |row| {
                    Ok(StoreStats {
                        total: row.get::<_, i64>(0)? as u64,
                        ready: row.get::<_, i64>(1)? as u64,
                        published: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .map_err(|e| StoreError::Database(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_store() -> SqliteItemStore {
        SqliteItemStore::in_memory().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn ready_item(id: &str, hour: u32) -> Item {
        Item::new(id, format!("Title {}", id), "Body")
            .with_translation("Перевод")
            .with_created_at(at(hour))
    }

    #[tokio::test]
    async fn test_exists_after_upsert() {
        let store = create_test_store();
        let ctx = RunContext::background();

        assert!(!store.exists(&ctx, "p1").await.unwrap());
        store.upsert(&ctx, &ready_item("p1", 1)).await.unwrap();
        assert!(store.exists(&ctx, "p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let store = create_test_store();
        let ctx = RunContext::background();
        let item = ready_item("p1", 3).with_media(vec![
            "https://i.redd.it/a.jpg".to_string(),
            "https://v.redd.it/b.mp4".to_string(),
        ]);

        store.upsert(&ctx, &item).await.unwrap();
        let fetched = store.get(&ctx, "p1").await.unwrap().unwrap();

        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = create_test_store();
        let ctx = RunContext::background();
        assert!(store.get(&ctx, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ready_orders_by_created_at() {
        let store = create_test_store();
        let ctx = RunContext::background();

        store.upsert(&ctx, &ready_item("late", 9)).await.unwrap();
        store.upsert(&ctx, &ready_item("early", 1)).await.unwrap();
        store.upsert(&ctx, &ready_item("middle", 5)).await.unwrap();

        let ids: Vec<String> = store
            .list_ready(&ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.source_id)
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_list_ready_excludes_untranslated_and_published() {
        let store = create_test_store();
        let ctx = RunContext::background();

        store
            .upsert(&ctx, &Item::new("raw", "t", "b").with_created_at(at(1)))
            .await
            .unwrap();
        store.upsert(&ctx, &ready_item("done", 2)).await.unwrap();
        store.upsert(&ctx, &ready_item("todo", 3)).await.unwrap();
        store.mark_published(&ctx, "done").await.unwrap();

        let ready = store.list_ready(&ctx).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].source_id, "todo");
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_and_published_at() {
        let store = create_test_store();
        let ctx = RunContext::background();

        store.upsert(&ctx, &ready_item("p1", 1)).await.unwrap();
        store.mark_published(&ctx, "p1").await.unwrap();

        let mut updated = ready_item("p1", 8);
        updated.translated_body = "Новый перевод".to_string();
        store.upsert(&ctx, &updated).await.unwrap();

        let fetched = store.get(&ctx, "p1").await.unwrap().unwrap();
        assert_eq!(fetched.created_at, at(1));
        assert!(fetched.published_at.is_some());
        assert_eq!(fetched.translated_body, "Новый перевод");
    }

    #[tokio::test]
    async fn test_mark_published_unknown_item() {
        let store = create_test_store();
        let ctx = RunContext::background();

        let result = store.mark_published(&ctx, "ghost").await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_mark_published_twice_keeps_first_timestamp() {
        let store = create_test_store();
        let ctx = RunContext::background();

        store.upsert(&ctx, &ready_item("p1", 1)).await.unwrap();
        store.mark_published(&ctx, "p1").await.unwrap();
        let first = store.get(&ctx, "p1").await.unwrap().unwrap().published_at;

        store.mark_published(&ctx, "p1").await.unwrap();
        let second = store.get(&ctx, "p1").await.unwrap().unwrap().published_at;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = create_test_store();
        let ctx = RunContext::background();

        store
            .upsert(&ctx, &Item::new("raw", "t", "b").with_created_at(at(1)))
            .await
            .unwrap();
        store.upsert(&ctx, &ready_item("a", 2)).await.unwrap();
        store.upsert(&ctx, &ready_item("b", 3)).await.unwrap();
        store.mark_published(&ctx, "a").await.unwrap();

        let stats = store.stats(&ctx).await.unwrap();
        assert_eq!(
            stats,
            StoreStats {
                total: 3,
                ready: 1,
                published: 1
            }
        );
    }

    #[tokio::test]
    async fn test_cancelled_context_rejects_operation() {
        let store = create_test_store();
        let ctx = RunContext::background();
        ctx.cancel();

        let result = store.exists(&ctx, "p1").await;
        assert!(matches!(result, Err(StoreError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_corrupt_media_is_an_error() {
        let store = create_test_store();
        let ctx = RunContext::background();
        store.upsert(&ctx, &ready_item("p1", 1)).await.unwrap();

        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE items SET media_refs = 'not json' WHERE source_id = 'p1'",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.get(&ctx, "p1").await,
            Err(StoreError::Database(_))
        ));
        assert!(matches!(
            store.list_ready(&ctx).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("items.db");
        let ctx = RunContext::background();

        {
            let store = SqliteItemStore::new(&db_path).unwrap();
            store.upsert(&ctx, &ready_item("p1", 1)).await.unwrap();
        }

        assert!(db_path.exists());

        let reopened = SqliteItemStore::new(&db_path).unwrap();
        assert!(reopened.exists(&ctx, "p1").await.unwrap());
    }
}
