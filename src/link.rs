//! Link records - one legacy id, at most one owned entity

use crate::kind::LinkKind;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the legacy SMS system.
///
/// Stored as a signed 64-bit integer but never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct LegacyId(i64);

impl LegacyId {
    pub fn new(id: i64) -> Result<Self> {
        if id < 0 {
            return Err(Error::InvalidInput(format!("legacy id must be non-negative, got {}", id)));
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for LegacyId {
    type Error = Error;

    fn try_from(id: i64) -> Result<Self> {
        Self::new(id)
    }
}

impl From<LegacyId> for i64 {
    fn from(id: LegacyId) -> i64 {
        id.0
    }
}

impl std::fmt::Display for LegacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a media platform collection or media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnedRef(String);

impl OwnedRef {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("owned entity id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OwnedRef {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<OwnedRef> for String {
    fn from(r: OwnedRef) -> String {
        r.0
    }
}

impl std::fmt::Display for OwnedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted link row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyLink {
    pub kind: LinkKind,
    /// Primary key, write-once
    pub legacy_id: LegacyId,
    /// When the legacy record was last imported; `None` if never synced
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Owned entity this legacy record maps to, if any
    pub owned_ref: Option<OwnedRef>,
}

impl LegacyLink {
    /// A link whose owned entity was never set or has been deleted
    pub fn is_orphaned(&self) -> bool {
        self.owned_ref.is_none()
    }
}

/// Which branch an upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}
