// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through TTL cache for offline reads.
//!
//! Expiry is checked on read, not via a background sweep: an expired entry
//! is deleted lazily by the access that discovers it. The cache is
//! consulted by the UI layer for offline reads and refreshed by the sync
//! engine when conflicts resolve in the remote's favor, but sync
//! correctness never depends on cache contents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::ClockSource;
use crate::photo::Photo;

/// A cached value with its expiry metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub data: T,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
    /// Bumped every time the key is overwritten.
    pub version: u64,
}

/// Prefix under which photo list views are cached.
pub const PHOTO_LIST_PREFIX: &str = "photos:";

/// Cache key for a single photo.
pub fn photo_key(id: &str) -> String {
    format!("photo:{id}")
}

/// Values the sync engine caches for the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheValue {
    /// A single photo, keyed `photo:{id}`.
    Photo(Photo),
    /// A list view of photos, keyed under the `photos:` prefix.
    PhotoList(Vec<Photo>),
}

/// In-memory TTL cache keyed by string.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn ClockSource>,
}

impl<T: Clone> TtlCache<T> {
    /// Creates an empty cache reading time from the given clock.
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the cached value for `key`, if present and not expired.
    ///
    /// An entry whose `expires_at` has passed is removed and `None` is
    /// returned; `now == expires_at` already counts as expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` for `ttl`.
    ///
    /// Overwriting an existing key bumps its version counter.
    pub fn set(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let now = self.clock.now();
        let key = key.into();
        let mut entries = self.lock();
        let version = entries.get(&key).map_or(1, |e| e.version + 1);
        entries.insert(
            key,
            CacheEntry {
                data: value,
                created_at: now,
                expires_at: now + ttl,
                version,
            },
        );
    }

    /// Removes every entry whose key starts with `prefix`.
    ///
    /// An exact key is its own prefix, so this also serves single-key
    /// invalidation.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.lock().retain(|key, _| !key.starts_with(prefix));
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries currently stored, including not-yet-collected
    /// expired ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone + Serialize + DeserializeOwned> TtlCache<T> {
    /// Serializes all live entries for persistence.
    ///
    /// Expired entries are dropped rather than snapshotted.
    pub fn snapshot(&self) -> serde_json::Result<String> {
        let now = self.clock.now();
        let entries = self.lock();
        let live: HashMap<&String, &CacheEntry<T>> = entries
            .iter()
            .filter(|(_, entry)| now < entry.expires_at)
            .collect();
        serde_json::to_string(&live)
    }

    /// Replaces the cache contents from a snapshot produced by
    /// [`TtlCache::snapshot`].
    pub fn restore(&self, snapshot: &str) -> serde_json::Result<()> {
        let restored: HashMap<String, CacheEntry<T>> = serde_json::from_str(snapshot)?;
        *self.lock() = restored;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
