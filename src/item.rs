//! The abstract output unit of a view.
//!
//! A `ListItem` is what a view hands back for the host to show: a label, a
//! target path (another plugin URL for directory entries, a media location
//! for playable ones), a playable flag, and an ordered metadata map. The
//! routing core does not interpret items beyond being the normalized return
//! shape forwarded to the renderer or resolver.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One browsable or playable entry produced by a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Primary display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Secondary display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label2: Option<String>,
    /// Target URL for directory entries, or media location for playable ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether selecting this item starts playback rather than listing.
    #[serde(default)]
    pub is_playable: bool,
    /// Ordered metadata forwarded to the host untouched.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub info: IndexMap<String, String>,
}

impl ListItem {
    /// A bare labeled item.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        ListItem {
            label: Some(label.into()),
            ..ListItem::default()
        }
    }

    /// A directory entry pointing at another plugin URL.
    #[must_use]
    pub fn directory(label: impl Into<String>, path: impl Into<String>) -> Self {
        ListItem {
            label: Some(label.into()),
            path: Some(path.into()),
            is_playable: false,
            ..ListItem::default()
        }
    }

    /// A playable entry pointing at a media location.
    #[must_use]
    pub fn playable(label: impl Into<String>, path: impl Into<String>) -> Self {
        ListItem {
            label: Some(label.into()),
            path: Some(path.into()),
            is_playable: true,
            ..ListItem::default()
        }
    }

    /// A resolved media location with no label, as handed to the resolver.
    #[must_use]
    pub fn resolved(path: impl Into<String>) -> Self {
        ListItem {
            path: Some(path.into()),
            is_playable: true,
            ..ListItem::default()
        }
    }

    /// Builder-style metadata insert.
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }
}
