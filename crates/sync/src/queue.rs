// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted action queue.
//!
//! The in-memory queue is the working copy; every mutation writes the full
//! updated list back through the persistence contract before returning, so
//! memory and disk can only disagree for one synchronous step. On startup
//! the queue is rebuilt from the persisted list. Removal merges by id
//! against the live queue, never by position, so actions enqueued while a
//! sync run drains a snapshot are preserved.
//!
//! Persistence failures are logged and do not fail the mutation; the next
//! successful persist writes the complete current list and heals the gap.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use eddy_core::{
    generate_action_id, ActionPayload, ClockSource, Error, KeyValueStore, OfflineAction, Result,
};

/// Persistence key for the pending-action list.
const KEY_PENDING: &str = "pending_actions";
/// Persistence key for the last successful sync timestamp.
const KEY_LAST_SYNC: &str = "last_sync_time";
/// Persistence key for the cache snapshot.
const KEY_CACHE_SNAPSHOT: &str = "cache_snapshot";

/// Typed wrapper over the key-value persistence contract.
///
/// Owns the serialization of the three engine blobs: pending-action list,
/// last-sync timestamp, and cache snapshot.
pub struct QueueStore {
    store: Arc<dyn KeyValueStore>,
}

impl QueueStore {
    /// Wraps a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        QueueStore { store }
    }

    /// Loads the persisted pending-action list; empty when never written.
    pub fn load_actions(&self) -> Result<Vec<OfflineAction>> {
        match self.get(KEY_PENDING)? {
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| Error::Persistence(format!("corrupt pending-action list: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Persists the full pending-action list.
    pub fn save_actions(&self, actions: &[OfflineAction]) -> Result<()> {
        let blob = serde_json::to_string(actions)
            .map_err(|e| Error::Persistence(format!("serialize pending-action list: {e}")))?;
        self.set(KEY_PENDING, &blob)
    }

    /// Loads the last successful sync timestamp.
    pub fn load_last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        match self.get(KEY_LAST_SYNC)? {
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| Error::Persistence(format!("corrupt last-sync timestamp: {e}"))),
            None => Ok(None),
        }
    }

    /// Persists the last successful sync timestamp.
    pub fn save_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        let blob = serde_json::to_string(&at)
            .map_err(|e| Error::Persistence(format!("serialize last-sync timestamp: {e}")))?;
        self.set(KEY_LAST_SYNC, &blob)
    }

    /// Loads the persisted cache snapshot blob, if any.
    pub fn load_cache_snapshot(&self) -> Result<Option<String>> {
        self.get(KEY_CACHE_SNAPSHOT)
    }

    /// Persists a cache snapshot blob.
    pub fn save_cache_snapshot(&self, snapshot: &str) -> Result<()> {
        self.set(KEY_CACHE_SNAPSHOT, snapshot)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.store
            .get(key)
            .map_err(|e| Error::Persistence(format!("read {key}: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store
            .set(key, value)
            .map_err(|e| Error::Persistence(format!("write {key}: {e}")))
    }
}

/// In-memory ordered collection of pending mutations, mirrored to the
/// persisted store on every mutation.
pub struct ActionQueue {
    actions: Mutex<Vec<OfflineAction>>,
    store: Arc<QueueStore>,
    clock: Arc<dyn ClockSource>,
    default_max_retries: u32,
    seq: AtomicU64,
}

impl ActionQueue {
    /// Rebuilds the queue from the persisted store.
    ///
    /// A missing list means a fresh start; a corrupt list is an error the
    /// caller must decide about rather than silent data loss.
    pub fn load(
        store: Arc<QueueStore>,
        clock: Arc<dyn ClockSource>,
        default_max_retries: u32,
    ) -> Result<Self> {
        let actions = store.load_actions()?;
        if !actions.is_empty() {
            tracing::info!(pending = actions.len(), "restored offline action queue");
        }
        Ok(ActionQueue {
            actions: Mutex::new(actions),
            store,
            clock,
            default_max_retries,
            seq: AtomicU64::new(0),
        })
    }

    /// Appends a new action and persists the updated list.
    ///
    /// The action gets a generated id, the current timestamp, a zero retry
    /// count, and the default retry budget unless one is given.
    pub fn enqueue(&self, payload: ActionPayload, max_retries: Option<u32>) -> OfflineAction {
        let now = self.clock.now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let id = generate_action_id(payload.entity_id(), &now, seq);
        let action = OfflineAction::new(
            id,
            payload,
            now,
            max_retries.unwrap_or(self.default_max_retries).max(1),
        );

        let mut actions = self.lock();
        actions.push(action.clone());
        self.persist(&actions);
        tracing::debug!(
            action = %action.id,
            kind = %action.kind(),
            entity = %action.entity_id(),
            pending = actions.len(),
            "enqueued offline action"
        );
        action
    }

    /// Returns a copy of the pending actions in queue order.
    pub fn snapshot(&self) -> Vec<OfflineAction> {
        self.lock().clone()
    }

    /// Removes the given ids and persists the updated list.
    ///
    /// Ids not present (already removed, or never existed) are ignored.
    pub fn remove(&self, ids: &HashSet<String>) {
        if ids.is_empty() {
            return;
        }
        let mut actions = self.lock();
        actions.retain(|action| !ids.contains(&action.id));
        self.persist(&actions);
    }

    /// Increments the retry count for one action and persists.
    ///
    /// Returns the new count, or `None` when the id is no longer queued.
    pub fn increment_retry(&self, id: &str) -> Option<u32> {
        let mut actions = self.lock();
        let count = {
            let action = actions.iter_mut().find(|a| a.id == id)?;
            action.retry_count += 1;
            action.retry_count
        };
        self.persist(&actions);
        Some(count)
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, actions: &[OfflineAction]) {
        if let Err(e) = self.store.save_actions(actions) {
            // The next successful persist writes the full list
            tracing::warn!("failed to persist action queue: {e}");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OfflineAction>> {
        self.actions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
