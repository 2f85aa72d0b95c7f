// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for engine tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use eddy_core::{ClockSource, ConnectivityState, Photo, RemoteError, RemoteResult};
use tokio::sync::{mpsc, Notify};

use crate::connectivity::ConnectivitySource;
use crate::repository::RemoteRepository;

/// Timestamp helper: seconds since epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// A photo with the given id/title, created at t=100, updated at
/// `updated_secs`.
pub fn make_photo(id: &str, title: &str, updated_secs: i64) -> Photo {
    let mut photo = Photo::new(id, title, format!("blob/{id}"), ts(100));
    photo.updated_at = ts(updated_secs);
    photo
}

/// Mock clock for testing with controllable time.
pub struct MockClock {
    secs: AtomicI64,
}

impl MockClock {
    pub fn new(initial_secs: i64) -> Self {
        MockClock {
            secs: AtomicI64::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now(&self) -> DateTime<Utc> {
        ts(self.secs.load(Ordering::SeqCst))
    }
}

/// Scripted connectivity source.
///
/// `push` delivers a transition to every subscriber and becomes the state
/// returned by subsequent `fetch_state` calls.
pub struct MockConnectivitySource {
    state: Mutex<ConnectivityState>,
    senders: Mutex<Vec<mpsc::UnboundedSender<ConnectivityState>>>,
}

impl MockConnectivitySource {
    pub fn new(initial: ConnectivityState) -> Self {
        MockConnectivitySource {
            state: Mutex::new(initial),
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a transition to all subscribers.
    pub fn push(&self, state: ConnectivityState) {
        *self.state.lock().unwrap() = state;
        self.senders
            .lock()
            .unwrap()
            .retain(|tx| tx.send(state).is_ok());
    }
}

impl ConnectivitySource for MockConnectivitySource {
    fn fetch_state(&self) -> Pin<Box<dyn Future<Output = ConnectivityState> + Send + '_>> {
        let state = *self.state.lock().unwrap();
        Box::pin(async move { state })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectivityState> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }
}

/// In-memory remote repository with scripted failures.
///
/// Failures queued with `fail_next` are consumed one per repository call,
/// in order, before any real behavior runs. An optional gate blocks every
/// call until released, for exercising in-flight states.
pub struct MockRemoteRepository {
    photos: Mutex<HashMap<String, Photo>>,
    fail_next: Mutex<VecDeque<RemoteError>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    in_flight: AtomicUsize,
}

impl MockRemoteRepository {
    pub fn new() -> Self {
        MockRemoteRepository {
            photos: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Seeds the remote store with a photo.
    pub fn insert(&self, photo: Photo) {
        self.photos.lock().unwrap().insert(photo.id.clone(), photo);
    }

    /// Returns the remote copy of a photo, if present.
    pub fn get(&self, id: &str) -> Option<Photo> {
        self.photos.lock().unwrap().get(id).cloned()
    }

    /// Queues an error to be returned by the next repository call.
    pub fn fail_next(&self, err: RemoteError) {
        self.fail_next.lock().unwrap().push_back(err);
    }

    /// Queues the same error for the next `n` repository calls.
    pub fn fail_times(&self, err: RemoteError, n: usize) {
        let mut queue = self.fail_next.lock().unwrap();
        for _ in 0..n {
            queue.push_back(err.clone());
        }
    }

    /// All repository calls made so far, as "method id" strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Blocks every repository call until `release_gate` is called.
    pub fn install_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Number of repository calls currently blocked on the gate.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: String) -> Option<RemoteError> {
        self.calls.lock().unwrap().push(call);
        let scripted = self.fail_next.lock().unwrap().pop_front();
        if scripted.is_some() {
            return scripted;
        }
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        None
    }
}

impl Default for MockRemoteRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteRepository for MockRemoteRepository {
    fn save<'a>(
        &'a self,
        photo: &'a Photo,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Photo>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.enter(format!("save {}", photo.id)).await {
                return Err(err);
            }
            let mut photos = self.photos.lock().unwrap();
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
            if let Some(err) = self.enter(format!("update {}", photo.id)).await {
                return Err(err);
            }
            let mut photos = self.photos.lock().unwrap();
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
            if let Some(err) = self.enter(format!("delete {id}")).await {
                return Err(err);
            }
            let mut photos = self.photos.lock().unwrap();
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
            if let Some(err) = self.enter(format!("find {id}")).await {
                return Err(err);
            }
            Ok(self.photos.lock().unwrap().get(id).cloned())
        })
    }

    fn find_modified_since<'a>(
        &'a self,
        since: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Vec<Photo>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(err) = self.enter(format!("modified_since {since}")).await {
                return Err(err);
            }
            let photos = self.photos.lock().unwrap();
            Ok(photos
                .values()
                .filter(|p| p.updated_at > since)
                .cloned()
                .collect())
        })
    }
}
