// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! eddy-sync: offline action queue and synchronization reconciler.
//!
//! An embeddable engine for offline-first mobile apps: local mutations
//! are queued while disconnected and deterministically replayed against
//! the authoritative remote store when connectivity returns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   transitions   ┌──────────────────┐
//! │ Connectivity │────────────────►│   ConnectivityMonitor
//! │   Source     │                 │  (dedup, edge detect)
//! └──────────────┘                 └────────┬─────────┘
//!                                   online  │ trigger
//!                                           ▼
//! ┌──────────────┐    snapshot     ┌──────────────────┐     ┌─────────┐
//! │ ActionQueue  │◄───────────────►│    Reconciler    │────►│ Remote  │
//! │ (persisted)  │  remove by id   │ (batches, retry, │     │  Repo   │
//! └──────────────┘                 │  conflicts)      │◄────│ (trait) │
//!                                  └────────┬─────────┘     └─────────┘
//!                                           │ publishes
//!                                           ▼
//!                                  ┌──────────────────┐
//!                                  │     StateHub     │──► subscribers
//!                                  └──────────────────┘
//! ```
//!
//! # Features
//!
//! - Persisted mutation queue rebuilt from storage across restarts
//! - Single-flight reconciler with bounded concurrent batches
//! - Pluggable conflict policies (client-wins, server-wins, merge, manual)
//! - Retry classification with per-action budgets
//! - Read-through TTL cache refreshed by conflict resolution and
//!   incremental pulls
//! - Injectable repository, persistence, connectivity, and clock seams
//!   for testing

mod config;
mod conflict;
mod connectivity;
mod hub;
mod queue;
mod reconciler;
mod repository;
mod service;
mod strategy;

pub use config::EngineConfig;
pub use conflict::{ConflictResolver, MergeFn};
pub use connectivity::{
    ConnectivityMonitor, ConnectivitySource, SharedConnectivity, SyncTrigger,
};
pub use hub::{StateHub, Subscription};
pub use queue::{ActionQueue, QueueStore};
pub use reconciler::{Reconciler, ReconcilerParts};
pub use repository::RemoteRepository;
pub use service::SyncService;
pub use strategy::{StrategyOutcome, StrategyRegistry, SyncStrategy};

#[cfg(test)]
mod test_helpers;
