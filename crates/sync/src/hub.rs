// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State hub: holds the composite engine state and fans out changes.
//!
//! Subscribers get immutable snapshots over a typed channel and an id they
//! can later pass to `unsubscribe`; there are no string-keyed event names.
//! Senders whose receiver was dropped are pruned on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use eddy_core::{ConnectivityState, EngineState, SyncState};
use tokio::sync::mpsc;

/// A live subscription to engine state changes.
///
/// Dropping the receiver is enough to stop delivery; calling
/// [`StateHub::unsubscribe`] additionally frees the sender slot eagerly.
pub struct Subscription {
    /// Token for [`StateHub::unsubscribe`].
    pub id: u64,
    /// Receives a fresh [`EngineState`] snapshot per change.
    pub rx: mpsc::UnboundedReceiver<EngineState>,
}

/// Holds the composite offline/sync state and notifies subscribers.
pub struct StateHub {
    state: Mutex<EngineState>,
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<EngineState>>>,
    next_id: AtomicU64,
}

impl StateHub {
    /// Creates a hub with default (offline, empty) state.
    pub fn new() -> Self {
        StateHub {
            state: Mutex::new(EngineState::default()),
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn snapshot(&self) -> EngineState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Registers a subscriber and returns its subscription.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        Subscription { id, rx }
    }

    /// Removes a subscriber by token. Unknown tokens are ignored.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Replaces the connectivity half of the state and publishes.
    pub fn set_connectivity(&self, connectivity: ConnectivityState) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.connectivity = connectivity;
            state.clone()
        };
        self.publish(snapshot);
    }

    /// Mutates the sync half of the state and publishes.
    pub fn update_sync(&self, f: impl FnOnce(&mut SyncState)) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut state.sync);
            state.clone()
        };
        self.publish(snapshot);
    }

    fn publish(&self, snapshot: EngineState) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|_, tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for StateHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
