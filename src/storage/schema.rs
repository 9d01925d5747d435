//! Database schema definitions

/// SQL to create the media platform collections table
///
/// Only the identifier is mirrored; the media platform owns everything else.
pub const CREATE_OWNED_COLLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS owned_collection (
    id TEXT PRIMARY KEY
)
"#;

/// SQL to create the media platform media items table
pub const CREATE_OWNED_MEDIA_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS owned_media_item (
    id TEXT PRIMARY KEY
)
"#;

/// SQL to create the legacy collection link table
pub const CREATE_COLLECTION_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS collection_link (
    legacy_id INTEGER PRIMARY KEY CHECK (legacy_id >= 0),
    last_synced_at TEXT,
    owned_collection_ref TEXT UNIQUE
        REFERENCES owned_collection(id) ON DELETE SET NULL
)
"#;

/// SQL to create the legacy media item link table
pub const CREATE_MEDIA_ITEM_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS media_item_link (
    legacy_id INTEGER PRIMARY KEY CHECK (legacy_id >= 0),
    last_synced_at TEXT,
    owned_media_ref TEXT UNIQUE
        REFERENCES owned_media_item(id) ON DELETE SET NULL
)
"#;

/// Pragmas applied to every connection before the schema
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// All schema creation statements
///
/// Owned tables come first so the foreign keys have a target.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_OWNED_COLLECTIONS_TABLE,
        CREATE_OWNED_MEDIA_ITEMS_TABLE,
        CREATE_COLLECTION_LINKS_TABLE,
        CREATE_MEDIA_ITEM_LINKS_TABLE,
    ]
}
