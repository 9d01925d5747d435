//! Link kinds
//!
//! The legacy SMS system exported two entity types, each mirrored by one
//! link table:
//! - `Collection`: legacy SMS collection → media platform collection
//! - `MediaItem`: legacy SMS media → media platform media item

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which owned entity a link row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Collection,
    MediaItem,
}

impl LinkKind {
    /// Get the string representation of the link kind
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Collection => "collection",
            LinkKind::MediaItem => "media_item",
        }
    }

    /// Get all link kinds
    pub fn all() -> &'static [LinkKind] {
        &[LinkKind::Collection, LinkKind::MediaItem]
    }

    /// Table holding the link rows
    pub(crate) fn link_table(&self) -> &'static str {
        match self {
            LinkKind::Collection => "collection_link",
            LinkKind::MediaItem => "media_item_link",
        }
    }

    /// Column on the link table referencing the owned entity
    pub(crate) fn ref_column(&self) -> &'static str {
        match self {
            LinkKind::Collection => "owned_collection_ref",
            LinkKind::MediaItem => "owned_media_ref",
        }
    }

    /// Table holding the owned entities
    pub(crate) fn owned_table(&self) -> &'static str {
        match self {
            LinkKind::Collection => "owned_collection",
            LinkKind::MediaItem => "owned_media_item",
        }
    }
}

impl FromStr for LinkKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collection" | "collections" => Ok(LinkKind::Collection),
            "media_item" | "mediaitem" | "media" | "item" => Ok(LinkKind::MediaItem),
            _ => Err(crate::Error::InvalidInput(format!("Unknown link kind: {}", s))),
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_kind_roundtrip() {
        for kind in LinkKind::all() {
            let parsed: LinkKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_link_kind_aliases() {
        assert_eq!("Media".parse::<LinkKind>().unwrap(), LinkKind::MediaItem);
        assert_eq!("COLLECTIONS".parse::<LinkKind>().unwrap(), LinkKind::Collection);
        assert!(matches!(
            "playlist".parse::<LinkKind>(),
            Err(crate::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_kinds_use_distinct_tables() {
        assert_ne!(LinkKind::Collection.link_table(), LinkKind::MediaItem.link_table());
        assert_ne!(LinkKind::Collection.owned_table(), LinkKind::MediaItem.owned_table());
    }
}
