// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for engine spec tests.
//!
//! Everything here drives the engine through its public API only: a
//! scripted remote store, a scripted connectivity source, a controllable
//! clock, and a builder that assembles a [`SyncService`] over an
//! in-memory persistence store.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use eddy_core::{
    ClockSource, ConnectivityState, MemoryStore, Photo, RemoteError, RemoteResult,
};
use eddy_sync::{ConnectivitySource, EngineConfig, RemoteRepository, SyncService};
use tokio::sync::mpsc;

/// Timestamp helper: seconds since epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(at) => at,
        None => DateTime::UNIX_EPOCH,
    }
}

/// A photo created at t=100 with the given update time.
pub fn photo(id: &str, title: &str, updated_secs: i64) -> Photo {
    let mut p = Photo::new(id, title, format!("blob/{id}"), ts(100));
    p.updated_at = ts(updated_secs);
    p
}

/// Controllable clock.
pub struct TestClock {
    secs: AtomicI64,
}

impl TestClock {
    pub fn new(initial_secs: i64) -> Self {
        TestClock {
            secs: AtomicI64::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl ClockSource for TestClock {
    fn now(&self) -> DateTime<Utc> {
        ts(self.secs.load(Ordering::SeqCst))
    }
}

/// Scripted connectivity source driven by tests.
pub struct ScriptedConnectivity {
    state: Mutex<ConnectivityState>,
    senders: Mutex<Vec<mpsc::UnboundedSender<ConnectivityState>>>,
}

impl ScriptedConnectivity {
    pub fn new(initial: ConnectivityState) -> Self {
        ScriptedConnectivity {
            state: Mutex::new(initial),
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a transition to the engine.
    pub fn push(&self, state: ConnectivityState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|tx| tx.send(state).is_ok());
        }
    }
}

impl ConnectivitySource for ScriptedConnectivity {
    fn fetch_state(&self) -> Pin<Box<dyn Future<Output = ConnectivityState> + Send + '_>> {
        let state = self
            .state
            .lock()
            .map(|s| *s)
            .unwrap_or_else(|_| ConnectivityState::offline());
        Box::pin(async move { state })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectivityState> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }
}

/// In-memory remote store with scripted failures, one consumed per call.
pub struct ScriptedRemote {
    photos: Mutex<HashMap<String, Photo>>,
    failures: Mutex<VecDeque<RemoteError>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        ScriptedRemote {
            photos: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn insert(&self, photo: Photo) {
        if let Ok(mut photos) = self.photos.lock() {
            photos.insert(photo.id.clone(), photo);
        }
    }

    pub fn get(&self, id: &str) -> Option<Photo> {
        self.photos.lock().ok()?.get(id).cloned()
    }

    /// Queues an error for the next repository call.
    pub fn fail_next(&self, err: RemoteError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(err);
        }
    }

    /// Queues the same error for the next `n` repository calls.
    pub fn fail_times(&self, err: RemoteError, n: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            for _ in 0..n {
                failures.push_back(err.clone());
            }
        }
    }

    fn take_failure(&self) -> Option<RemoteError> {
        self.failures.lock().ok()?.pop_front()
    }
}

impl Default for ScriptedRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteRepository for ScriptedRemote {
    fn save<'a>(
        &'a self,
        photo: &'a Photo,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Photo>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut photos = self.photos.lock().map_err(|_| RemoteError::network("lock"))?;
            if photos.contains_key(&photo.id) {
                return Err(RemoteError::http(409, format!("photo exists: {}", photo.id)));
            }
            photos.insert(photo.id.clone(), photo.clone());
            Ok(photo.clone())
        })
    }

    fn update<'a>(
        &'a self,
        photo: &'a Photo,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Photo>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut photos = self.photos.lock().map_err(|_| RemoteError::network("lock"))?;
            if !photos.contains_key(&photo.id) {
                return Err(RemoteError::not_found(&photo.id));
            }
            photos.insert(photo.id.clone(), photo.clone());
            Ok(photo.clone())
        })
    }

    fn delete<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut photos = self.photos.lock().map_err(|_| RemoteError::network("lock"))?;
            if photos.remove(id).is_none() {
                return Err(RemoteError::not_found(id));
            }
            Ok(())
        })
    }

    fn find_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Photo>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let photos = self.photos.lock().map_err(|_| RemoteError::network("lock"))?;
            Ok(photos.get(id).cloned())
        })
    }

    fn find_modified_since<'a>(
        &'a self,
        since: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Vec<Photo>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let photos = self.photos.lock().map_err(|_| RemoteError::network("lock"))?;
            Ok(photos
                .values()
                .filter(|p| p.updated_at > since)
                .cloned()
                .collect())
        })
    }
}

/// A fully wired service plus handles to its collaborators.
pub struct Harness {
    pub service: SyncService,
    pub remote: Arc<ScriptedRemote>,
    pub connectivity: Arc<ScriptedConnectivity>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<TestClock>,
}

/// Builds a service over fresh in-memory collaborators.
pub fn harness(initial: ConnectivityState, config: EngineConfig) -> Harness {
    harness_with_store(initial, config, Arc::new(MemoryStore::new()))
}

/// Builds a service over an existing persistence store, for restart
/// scenarios.
pub fn harness_with_store(
    initial: ConnectivityState,
    config: EngineConfig,
    store: Arc<MemoryStore>,
) -> Harness {
    let remote = Arc::new(ScriptedRemote::new());
    let connectivity = Arc::new(ScriptedConnectivity::new(initial));
    let clock = Arc::new(TestClock::new(1_000));
    let service = match SyncService::with_parts(
        remote.clone(),
        store.clone(),
        connectivity.clone(),
        config,
        None,
        clock.clone(),
    ) {
        Ok(service) => service,
        Err(e) => unreachable!("service construction failed: {e}"),
    };
    Harness {
        service,
        remote,
        connectivity,
        store,
        clock,
    }
}
