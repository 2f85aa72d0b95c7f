// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking for the sync engine.
//!
//! Wraps an external reachability signal behind [`ConnectivitySource`],
//! mirrors the current state into atomics for lock-free reads from the
//! reconciler, and watches transitions in a background task. A
//! `false → true` edge on `is_online` emits a [`SyncTrigger`] that the
//! service turns into an automatic reconciler run. Repeated identical
//! states are deduplicated before anything is notified.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use eddy_core::{ConnectionKind, ConnectivityState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::hub::StateHub;

/// Connection kind values for the atomic kind field.
const KIND_NONE: u8 = 0;
const KIND_WIFI: u8 = 1;
const KIND_CELLULAR: u8 = 2;
const KIND_ETHERNET: u8 = 3;

/// External network-reachability signal.
///
/// The platform shell implements this against its reachability API; tests
/// drive a scripted implementation.
pub trait ConnectivitySource: Send + Sync {
    /// Reads the immediate connectivity state.
    fn fetch_state(&self) -> Pin<Box<dyn Future<Output = ConnectivityState> + Send + '_>>;

    /// Registers a change listener; transitions arrive on the returned
    /// channel until the source is dropped.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectivityState>;
}

/// Notification that connectivity came back and a sync run should be
/// scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTrigger;

/// Connectivity state readable without locking.
///
/// Uses atomic fields so the reconciler can re-check `is_online` between
/// batches without contending with the watcher task.
pub struct SharedConnectivity {
    online: AtomicBool,
    reachable: AtomicBool,
    kind: AtomicU8,
}

impl SharedConnectivity {
    /// Creates shared state initialized to offline.
    pub fn new() -> Self {
        SharedConnectivity {
            online: AtomicBool::new(false),
            reachable: AtomicBool::new(false),
            kind: AtomicU8::new(KIND_NONE),
        }
    }

    /// Returns the current state.
    pub fn get(&self) -> ConnectivityState {
        ConnectivityState {
            is_online: self.online.load(Ordering::Acquire),
            is_reachable: self.reachable.load(Ordering::Acquire),
            connection_kind: match self.kind.load(Ordering::Acquire) {
                KIND_WIFI => Some(ConnectionKind::Wifi),
                KIND_CELLULAR => Some(ConnectionKind::Cellular),
                KIND_ETHERNET => Some(ConnectionKind::Ethernet),
                _ => None,
            },
        }
    }

    /// Replaces the current state.
    pub fn set(&self, state: ConnectivityState) {
        self.online.store(state.is_online, Ordering::Release);
        self.reachable.store(state.is_reachable, Ordering::Release);
        self.kind.store(
            match state.connection_kind {
                Some(ConnectionKind::Wifi) => KIND_WIFI,
                Some(ConnectionKind::Cellular) => KIND_CELLULAR,
                Some(ConnectionKind::Ethernet) => KIND_ETHERNET,
                None => KIND_NONE,
            },
            Ordering::Release,
        );
    }

    /// Check if currently online.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Watches a [`ConnectivitySource`] and feeds state changes into the
/// engine.
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    shared: Arc<SharedConnectivity>,
    hub: Arc<StateHub>,
    cancel: CancellationToken,
}

impl ConnectivityMonitor {
    /// Creates a monitor over the given source.
    pub fn new(
        source: Arc<dyn ConnectivitySource>,
        shared: Arc<SharedConnectivity>,
        hub: Arc<StateHub>,
        cancel: CancellationToken,
    ) -> Self {
        ConnectivityMonitor {
            source,
            shared,
            hub,
            cancel,
        }
    }

    /// Reads the immediate state, then spawns the watcher task.
    ///
    /// Returns the receiver for sync triggers emitted on `false → true`
    /// `is_online` edges. The initial fetch sets state without emitting a
    /// trigger: there is no edge to act on yet.
    pub async fn start(&self) -> mpsc::UnboundedReceiver<SyncTrigger> {
        let initial = self.source.fetch_state().await;
        self.shared.set(initial);
        self.hub.set_connectivity(initial);
        tracing::debug!(
            online = initial.is_online,
            reachable = initial.is_reachable,
            "initial connectivity"
        );

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let transitions = self.source.subscribe();
        let shared = Arc::clone(&self.shared);
        let hub = Arc::clone(&self.hub);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            watch(transitions, shared, hub, trigger_tx, cancel).await;
        });

        trigger_rx
    }
}

/// Background task: apply transitions until cancelled or the source
/// closes.
async fn watch(
    mut transitions: mpsc::UnboundedReceiver<ConnectivityState>,
    shared: Arc<SharedConnectivity>,
    hub: Arc<StateHub>,
    trigger_tx: mpsc::UnboundedSender<SyncTrigger>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            next = transitions.recv() => {
                let Some(next) = next else { return };
                let prev = shared.get();
                if next == prev {
                    // De-duplicate repeated identical states
                    continue;
                }

                shared.set(next);
                hub.set_connectivity(next);
                tracing::info!(
                    online = next.is_online,
                    reachable = next.is_reachable,
                    "connectivity changed"
                );

                if !prev.is_online && next.is_online {
                    // Receiver gone means the engine is shutting down
                    let _ = trigger_tx.send(SyncTrigger);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
