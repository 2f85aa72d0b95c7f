// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Composite offline/sync state and per-run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::OfflineAction;

/// The kind of network connection currently in use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Wifi,
    Cellular,
    Ethernet,
}

/// Snapshot of the device's network reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Whether the device believes it has a usable connection.
    pub is_online: bool,
    /// Whether the remote endpoint is reachable over that connection.
    pub is_reachable: bool,
    /// The connection medium, when known.
    pub connection_kind: Option<ConnectionKind>,
}

impl ConnectivityState {
    /// State for a device with no connectivity.
    pub fn offline() -> Self {
        ConnectivityState {
            is_online: false,
            is_reachable: false,
            connection_kind: None,
        }
    }

    /// State for a device online and reachable over `kind`.
    pub fn online(kind: ConnectionKind) -> Self {
        ConnectivityState {
            is_online: true,
            is_reachable: true,
            connection_kind: Some(kind),
        }
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::offline()
    }
}

/// The queue-and-sync half of the engine state.
///
/// Rebuilt from persistence on startup; the persisted copy is the source
/// of truth across restarts.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    /// Actions awaiting remote application, in queue order.
    pub pending_actions: Vec<OfflineAction>,
    /// When the last successful sync run finished.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Whether a reconciler run is active right now.
    pub sync_in_progress: bool,
}

/// The full state published to subscribers: connectivity plus sync.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub connectivity: ConnectivityState,
    pub sync: SyncState,
}

/// How diverged local/remote copies are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Re-apply the local value unconditionally.
    #[default]
    ClientWins,
    /// Discard the local change and refresh the cache from the remote.
    ServerWins,
    /// Field-level merge (custom function, or the default photo rule).
    Merge,
    /// Caller-supplied resolver; errors the action when none is supplied.
    Manual,
}

/// One failed action inside a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// The id of the action that failed.
    pub action_id: String,
    /// Human-readable failure description.
    pub message: String,
    /// Whether the action stayed queued for another attempt.
    pub retryable: bool,
}

/// Outcome of one reconciler run. Produced fresh per run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// True only if no action failed.
    pub success: bool,
    /// Actions applied (or resolved) this run.
    pub synced_count: u32,
    /// Actions that recorded an error this run.
    pub failed_count: u32,
    /// Per-action failure details.
    pub errors: Vec<SyncFailure>,
    /// Wall time the run took.
    pub duration_ms: u64,
}

impl SyncReport {
    /// Builds a report from tallies; `success`/`failed_count` are derived
    /// from the error list.
    pub fn from_run(synced_count: u32, errors: Vec<SyncFailure>, duration_ms: u64) -> Self {
        // CORRECTNESS: error count bounded by queue length, fits in u32
        #[allow(clippy::cast_possible_truncation)]
        let failed_count = errors.len() as u32;
        SyncReport {
            success: failed_count == 0,
            synced_count,
            failed_count,
            errors,
            duration_ms,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
