//! TTL-aware persistent key/value storage.
//!
//! Views cache through named storage instances handed out by the plugin.
//! The map lives in memory; writes to disk are delayed until `sync` (or the
//! flush the dispatcher performs when a run reaches `Done`). Each entry
//! carries the timestamp it was stored at; with a TTL configured, stale
//! entries are dropped on load and on access.
//!
//! Across processes there is no locking: storage is append-only within a
//! process and last-writer-wins between processes. `sync` writes to a
//! temporary file and renames it over the target, so a reader never sees a
//! half-written file.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::PluginError;

/// Shared handle to an open storage instance. Dispatch is single-threaded,
/// so interior mutability is a `RefCell`.
pub type StorageHandle = Rc<RefCell<TimedStorage>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimedEntry {
    value: Value,
    stored_at: u64,
}

/// A persistent map with per-entry timestamps and an optional TTL.
#[derive(Debug)]
pub struct TimedStorage {
    path: PathBuf,
    ttl: Option<Duration>,
    items: IndexMap<String, TimedEntry>,
}

impl TimedStorage {
    /// Open a storage file, creating parent directories as needed.
    ///
    /// Entries older than `ttl` are pruned during load. A missing file
    /// yields an empty storage; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self, PluginError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut items: IndexMap<String, TimedEntry> = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            IndexMap::new()
        };

        if let Some(ttl) = ttl {
            let now = now_secs();
            items.retain(|_, entry| !expired(entry, now, ttl));
        }

        debug!(path = %path.display(), entries = items.len(), "Storage opened");
        Ok(TimedStorage { path, ttl, items })
    }

    /// The on-disk location of this storage.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Get a value. An entry past its TTL is removed and `None` returned.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = now_secs();
        if let Some(ttl) = self.ttl {
            if self.items.get(key).is_some_and(|e| expired(e, now, ttl)) {
                self.items.shift_remove(key);
                return None;
            }
        }
        self.items.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value under the current timestamp.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.items.insert(
            key.into(),
            TimedEntry {
                value,
                stored_at: now_secs(),
            },
        );
    }

    /// Remove an entry, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.items.shift_remove(key).map(|entry| entry.value)
    }

    /// Whether a (non-expired) entry exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        match (self.ttl, self.items.get(key)) {
            (Some(ttl), Some(entry)) => !expired(entry, now_secs(), ttl),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    /// Number of entries, including any not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the storage holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Drop all entries and persist the empty map.
    pub fn clear(&mut self) -> Result<(), PluginError> {
        self.items.clear();
        self.sync()
    }

    /// Write the map to disk: temp file, then atomic rename.
    pub fn sync(&self) -> Result<(), PluginError> {
        let temp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec(&self.items)?;
        if let Err(e) = fs::write(&temp, bytes) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), entries = self.items.len(), "Storage synced");
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn expired(entry: &TimedEntry, now: u64, ttl: Duration) -> bool {
    now.saturating_sub(entry.stored_at) > ttl.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = TimedStorage::open(dir.path().join("cache.json"), None).unwrap();
        storage.set("foo", json!("bar"));
        assert_eq!(storage.get("foo"), Some(json!("bar")));
        assert_eq!(storage.get("missing"), None);
    }

    #[test]
    fn sync_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let mut storage = TimedStorage::open(&path, None).unwrap();
            storage.set("count", json!(3));
            storage.sync().unwrap();
        }
        let mut reopened = TimedStorage::open(&path, None).unwrap();
        assert_eq!(reopened.get("count"), Some(json!(3)));
    }

    #[test]
    fn expired_entries_pruned_on_access() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage =
            TimedStorage::open(dir.path().join("cache.json"), Some(Duration::from_secs(60)))
                .unwrap();
        storage.items.insert(
            "old".to_string(),
            TimedEntry {
                value: json!("stale"),
                stored_at: now_secs() - 120,
            },
        );
        storage.set("fresh", json!("ok"));

        assert_eq!(storage.get("old"), None);
        assert!(!storage.contains("old"));
        assert_eq!(storage.get("fresh"), Some(json!("ok")));
    }

    #[test]
    fn expired_entries_pruned_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let mut storage = TimedStorage::open(&path, None).unwrap();
            storage.items.insert(
                "old".to_string(),
                TimedEntry {
                    value: json!("stale"),
                    stored_at: now_secs() - 120,
                },
            );
            storage.set("fresh", json!("ok"));
            storage.sync().unwrap();
        }
        let reopened =
            TimedStorage::open(&path, Some(Duration::from_secs(60))).unwrap();
        assert!(!reopened.contains("old"));
        assert!(reopened.contains("fresh"));
    }

    #[test]
    fn clear_persists_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut storage = TimedStorage::open(&path, None).unwrap();
        storage.set("foo", json!(1));
        storage.clear().unwrap();
        let reopened = TimedStorage::open(&path, None).unwrap();
        assert!(reopened.is_empty());
    }
}
