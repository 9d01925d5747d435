//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - collection_link(legacy_id, last_synced_at, owned_collection_ref)
//! - media_item_link(legacy_id, last_synced_at, owned_media_ref)
//! - owned_collection(id), owned_media_item(id)

pub mod schema;
pub mod sqlite;

pub use sqlite::{KindStats, LinkStats, LinkStore, StoreOptions};
