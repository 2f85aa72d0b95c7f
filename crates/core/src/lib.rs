// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! eddy-core: Shared library for the eddy offline sync engine
//!
//! This crate provides the data model, error taxonomy, clock abstraction,
//! TTL cache, and persistence contract used by the eddy-sync engine and
//! the application shell embedding it.

pub mod action;
pub mod cache;
pub mod clock;
pub mod error;
pub mod photo;
pub mod state;
pub mod store;

pub use action::{generate_action_id, ActionKind, ActionPayload, EntityKind, OfflineAction};
pub use cache::{photo_key, CacheEntry, CacheValue, TtlCache, PHOTO_LIST_PREFIX};
pub use clock::{ClockSource, SystemClock};
pub use error::{Error, RemoteError, RemoteResult, Result};
pub use photo::Photo;
pub use state::{
    ConflictPolicy, ConnectionKind, ConnectivityState, EngineState, SyncFailure, SyncReport,
    SyncState,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
