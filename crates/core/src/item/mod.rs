//! Items and their durable storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteItemStore;
pub use store::{ItemStore, StoreError, StoreStats};
pub use types::Item;
