//! # legacysms - Legacy SMS link store
//!
//! Durable correspondence between identifiers assigned by the legacy SMS
//! system and the collections and media items owned by the media platform.
//!
//! legacysms provides:
//! - Two link kinds (collection, media item) sharing one record shape
//! - SQLite-backed storage with one-to-one, null-on-delete owned references
//! - Transactional upsert / clear operations safe under concurrent writers
//! - Forward (legacy id) and reverse (owned entity) lookups

pub mod kind;
pub mod link;
pub mod storage;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use kind::LinkKind;
pub use link::{LegacyId, LegacyLink, OwnedRef, UpsertOutcome};
pub use storage::{LinkStats, LinkStore};

/// Result type alias for legacysms operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for legacysms operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
