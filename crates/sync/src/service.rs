// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Public facade for the sync engine.
//!
//! A [`SyncService`] is constructed explicitly at application startup and
//! passed by reference to consumers; there is no process-wide singleton.
//! It wires the persisted queue, cache, connectivity monitor, and
//! reconciler together, and owns the background task that turns
//! offline-to-online transitions into automatic sync runs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use eddy_core::{
    ActionPayload, CacheValue, ClockSource, EngineState, KeyValueStore, OfflineAction, Result,
    SyncReport, SystemClock, TtlCache,
};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::conflict::{ConflictResolver, MergeFn};
use crate::connectivity::{ConnectivityMonitor, ConnectivitySource, SharedConnectivity};
use crate::hub::{StateHub, Subscription};
use crate::queue::{ActionQueue, QueueStore};
use crate::reconciler::{Reconciler, ReconcilerParts};
use crate::repository::RemoteRepository;
use crate::strategy::StrategyRegistry;

/// The offline queue and sync engine, assembled.
pub struct SyncService {
    config: EngineConfig,
    queue: Arc<ActionQueue>,
    cache: Arc<TtlCache<CacheValue>>,
    hub: Arc<StateHub>,
    connectivity: Arc<SharedConnectivity>,
    reconciler: Arc<Reconciler>,
    source: Arc<dyn ConnectivitySource>,
    cancel: CancellationToken,
}

impl SyncService {
    /// Creates a service with the system clock and no custom merge
    /// function.
    pub fn new(
        repo: Arc<dyn RemoteRepository>,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn ConnectivitySource>,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::with_parts(repo, store, source, config, None, Arc::new(SystemClock))
    }

    /// Creates a service with every collaborator injected (for tests and
    /// custom merge policies).
    ///
    /// Rebuilds the queue and cache from persistence; a corrupt persisted
    /// queue is surfaced as a persistence error rather than dropped.
    pub fn with_parts(
        repo: Arc<dyn RemoteRepository>,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn ConnectivitySource>,
        config: EngineConfig,
        merge_fn: Option<MergeFn>,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        let queue_store = Arc::new(QueueStore::new(store));
        let queue = Arc::new(ActionQueue::load(
            queue_store.clone(),
            clock.clone(),
            config.default_max_retries,
        )?);

        let cache = Arc::new(TtlCache::new(clock.clone()));
        match queue_store.load_cache_snapshot() {
            Ok(Some(snapshot)) => {
                if let Err(e) = cache.restore(&snapshot) {
                    tracing::warn!("discarding unreadable cache snapshot: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to read cache snapshot: {e}"),
        }

        let last_sync = queue_store.load_last_sync().unwrap_or_else(|e| {
            tracing::warn!("failed to read last-sync time: {e}");
            None
        });

        let hub = Arc::new(StateHub::new());
        let pending = queue.snapshot();
        hub.update_sync(move |sync| {
            sync.pending_actions = pending;
            sync.last_sync_time = last_sync;
        });

        let connectivity = Arc::new(SharedConnectivity::new());
        let resolver = match merge_fn {
            Some(f) => ConflictResolver::with_merge_fn(config.cache_ttl, f),
            None => ConflictResolver::new(config.cache_ttl),
        };

        let reconciler = Arc::new(Reconciler::new(
            ReconcilerParts {
                queue: queue.clone(),
                store: queue_store,
                cache: cache.clone(),
                repo,
                registry: StrategyRegistry::with_defaults(),
                resolver,
                connectivity: connectivity.clone(),
                hub: hub.clone(),
                clock,
            },
            &config,
        ));

        Ok(SyncService {
            config,
            queue,
            cache,
            hub,
            connectivity,
            reconciler,
            source,
            cancel: CancellationToken::new(),
        })
    }

    /// Starts the connectivity watcher and the automatic-sync task.
    ///
    /// Reads the immediate connectivity state before returning, so
    /// `state()` is accurate once this resolves.
    pub async fn start(&self) {
        let monitor = ConnectivityMonitor::new(
            self.source.clone(),
            self.connectivity.clone(),
            self.hub.clone(),
            self.cancel.clone(),
        );
        let mut triggers = monitor.start().await;

        let reconciler = self.reconciler.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    trigger = triggers.recv() => {
                        if trigger.is_none() {
                            return;
                        }
                        match reconciler.sync().await {
                            Ok(report) => tracing::info!(
                                synced = report.synced_count,
                                failed = report.failed_count,
                                "automatic sync completed"
                            ),
                            Err(eddy_core::Error::SyncInProgress) => {
                                tracing::debug!("automatic sync skipped; a run is active");
                            }
                            Err(eddy_core::Error::Offline) => {
                                tracing::debug!("automatic sync skipped; offline again");
                            }
                            Err(e) => tracing::warn!("automatic sync failed: {e}"),
                        }
                    }
                }
            }
        });
    }

    /// Stops the background tasks. Queued actions stay persisted.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Queues a local mutation for later replay.
    ///
    /// The optimistic local effect (updating the UI's own copy) is the
    /// caller's job; the queue only guarantees remote application.
    pub fn enqueue(&self, payload: ActionPayload, max_retries: Option<u32>) -> OfflineAction {
        let action = self.queue.enqueue(payload, max_retries);
        let pending = self.queue.snapshot();
        self.hub.update_sync(move |sync| sync.pending_actions = pending);
        action
    }

    /// Returns the current composite state snapshot.
    pub fn state(&self) -> EngineState {
        self.hub.snapshot()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// Removes a subscription by token.
    pub fn unsubscribe(&self, id: u64) {
        self.hub.unsubscribe(id);
    }

    /// Number of actions awaiting replay.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Runs one sync now; fails fast when offline or already running.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        self.reconciler.sync().await
    }

    /// Runs one sync with the conflict policy forced to client-wins.
    pub async fn force_sync(&self) -> Result<SyncReport> {
        self.reconciler.force_sync().await
    }

    /// Runs one sync, then refreshes the cache from remote changes.
    pub async fn incremental_sync(
        &self,
        since_override: Option<DateTime<Utc>>,
    ) -> Result<SyncReport> {
        self.reconciler.incremental_sync(since_override).await
    }

    /// Reads a cached value; expired entries count as absent.
    pub fn cache_get(&self, key: &str) -> Option<CacheValue> {
        self.cache.get(key)
    }

    /// Caches a value; `ttl` defaults to the configured cache TTL.
    pub fn cache_set(&self, key: impl Into<String>, value: CacheValue, ttl: Option<Duration>) {
        self.cache
            .set(key, value, ttl.unwrap_or(self.config.cache_ttl));
    }

    /// Invalidates by key-or-prefix, or everything when `None`.
    pub fn cache_invalidate(&self, key_or_prefix: Option<&str>) {
        match key_or_prefix {
            Some(prefix) => self.cache.invalidate_prefix(prefix),
            None => self.cache.clear(),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
