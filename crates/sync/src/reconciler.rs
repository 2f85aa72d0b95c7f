// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler: drains the action queue against the remote store.
//!
//! One run moves `Idle → Running → Idle`. Entry is gated by an atomic
//! single-flight flag and the connectivity state; a rejected entry has no
//! side effects. The run itself:
//!
//! 1. Snapshots the pending actions
//! 2. Sorts by (strategy priority asc, enqueued_at asc)
//! 3. Splits into fixed-size batches executed strictly in sequence
//! 4. Runs each batch as a joined set of concurrent futures with
//!    per-action error capture; one failure never cancels its siblings
//! 5. Classifies every outcome (success, conflict, retryable, fatal)
//! 6. Removes finished ids, persists, stamps the sync time, publishes
//!
//! Connectivity loss mid-run does not abort in-flight actions; it stops
//! further batches and leaves the remainder queued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use eddy_core::{
    photo_key, CacheValue, ClockSource, ConflictPolicy, Error, OfflineAction, Result, SyncFailure,
    SyncReport, TtlCache, PHOTO_LIST_PREFIX,
};
use futures_util::future::join_all;

use crate::config::EngineConfig;
use crate::conflict::ConflictResolver;
use crate::connectivity::SharedConnectivity;
use crate::hub::StateHub;
use crate::queue::{ActionQueue, QueueStore};
use crate::repository::RemoteRepository;
use crate::strategy::{StrategyOutcome, StrategyRegistry};

/// What happened to one action in a run.
enum Disposition {
    /// Applied (or resolved); remove from the queue.
    Synced,
    /// Retryable failure; keep queued until the budget is spent.
    Retry(String),
    /// Non-retryable failure; remove immediately.
    Fatal(String),
}

/// Collaborators the reconciler drives.
pub struct ReconcilerParts {
    pub queue: Arc<ActionQueue>,
    pub store: Arc<QueueStore>,
    pub cache: Arc<TtlCache<CacheValue>>,
    pub repo: Arc<dyn RemoteRepository>,
    pub registry: StrategyRegistry,
    pub resolver: ConflictResolver,
    pub connectivity: Arc<SharedConnectivity>,
    pub hub: Arc<StateHub>,
    pub clock: Arc<dyn ClockSource>,
}

/// Orchestrates sync runs over the queue, strategies, and resolver.
pub struct Reconciler {
    queue: Arc<ActionQueue>,
    store: Arc<QueueStore>,
    cache: Arc<TtlCache<CacheValue>>,
    repo: Arc<dyn RemoteRepository>,
    registry: StrategyRegistry,
    resolver: ConflictResolver,
    connectivity: Arc<SharedConnectivity>,
    hub: Arc<StateHub>,
    clock: Arc<dyn ClockSource>,
    policy: ConflictPolicy,
    batch_size: usize,
    cache_ttl: Duration,
    in_flight: AtomicBool,
}

impl Reconciler {
    /// Assembles a reconciler from its parts and config.
    pub fn new(parts: ReconcilerParts, config: &EngineConfig) -> Self {
        Reconciler {
            queue: parts.queue,
            store: parts.store,
            cache: parts.cache,
            repo: parts.repo,
            registry: parts.registry,
            resolver: parts.resolver,
            connectivity: parts.connectivity,
            hub: parts.hub,
            clock: parts.clock,
            policy: config.policy,
            batch_size: config.batch_size.max(1),
            cache_ttl: config.cache_ttl,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs one sync under the configured policy.
    pub async fn sync(&self) -> Result<SyncReport> {
        self.run(None).await
    }

    /// Runs one sync with the policy overridden to `ClientWins`.
    ///
    /// The configured policy is untouched; the override lives only for
    /// this run.
    pub async fn force_sync(&self) -> Result<SyncReport> {
        self.run(Some(ConflictPolicy::ClientWins)).await
    }

    /// Runs one sync, then pulls remote changes into the cache.
    ///
    /// The pull covers entities modified since the previous last-sync
    /// time (or `since_override` when given) and invalidates cached list
    /// views. It is best-effort: a pull failure is logged and does not
    /// fail the returned report.
    pub async fn incremental_sync(
        &self,
        since_override: Option<DateTime<Utc>>,
    ) -> Result<SyncReport> {
        // Capture before the run stamps a fresh last-sync time
        let since = match since_override {
            Some(at) => Some(at),
            None => self.store.load_last_sync().unwrap_or_else(|e| {
                tracing::warn!("failed to read last-sync time: {e}");
                None
            }),
        };

        let report = self.run(None).await?;
        if report.success {
            self.pull_modified(since).await;
        }
        Ok(report)
    }

    /// The full run algorithm; `policy_override` scopes a different
    /// conflict policy to this run only.
    async fn run(&self, policy_override: Option<ConflictPolicy>) -> Result<SyncReport> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SyncInProgress);
        }

        let policy = policy_override.unwrap_or(self.policy);
        self.hub.update_sync(|sync| sync.sync_in_progress = true);
        let started = Instant::now();

        let mut ordered = self.queue.snapshot();
        ordered.sort_by_key(|action| {
            let priority = self
                .registry
                .resolve(action)
                .map_or(u8::MAX, |s| s.priority());
            (priority, action.enqueued_at)
        });
        tracing::info!(pending = ordered.len(), ?policy, "sync run started");

        let mut synced_count = 0u32;
        let mut errors: Vec<SyncFailure> = Vec::new();
        let mut removals: HashSet<String> = HashSet::new();
        let mut processed = 0usize;

        for batch in ordered.chunks(self.batch_size) {
            // Re-check before starting each batch; in-flight actions are
            // allowed to finish, further batches are not started.
            if !self.connectivity.is_online() {
                tracing::info!(
                    remaining = ordered.len() - processed,
                    "connectivity lost mid-run; leaving remaining actions queued"
                );
                break;
            }
            processed += batch.len();

            let dispositions = join_all(
                batch
                    .iter()
                    .map(|action| self.execute_action(action, policy)),
            )
            .await;

            for (action, disposition) in batch.iter().zip(dispositions) {
                match disposition {
                    Disposition::Synced => {
                        synced_count += 1;
                        removals.insert(action.id.clone());
                    }
                    Disposition::Fatal(message) => {
                        tracing::warn!(action = %action.id, %message, "action failed permanently");
                        removals.insert(action.id.clone());
                        errors.push(SyncFailure {
                            action_id: action.id.clone(),
                            message,
                            retryable: false,
                        });
                    }
                    Disposition::Retry(message) => {
                        let count = self
                            .queue
                            .increment_retry(&action.id)
                            .unwrap_or(action.retry_count + 1);
                        if count >= action.max_retries {
                            tracing::warn!(
                                action = %action.id,
                                retries = count,
                                "retry budget exhausted; removing action"
                            );
                            removals.insert(action.id.clone());
                            errors.push(SyncFailure {
                                action_id: action.id.clone(),
                                message: format!("{message} (retries exhausted)"),
                                retryable: false,
                            });
                        } else {
                            tracing::debug!(
                                action = %action.id,
                                retries = count,
                                %message,
                                "action failed; kept queued"
                            );
                            errors.push(SyncFailure {
                                action_id: action.id.clone(),
                                message,
                                retryable: true,
                            });
                        }
                    }
                }
            }
        }

        self.queue.remove(&removals);
        let now = self.clock.now();
        if let Err(e) = self.store.save_last_sync(now) {
            tracing::warn!("failed to persist last-sync time: {e}");
        }
        self.persist_cache();

        // CORRECTNESS: a run is bounded by per-call timeouts, millis fit
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;

        self.in_flight.store(false, Ordering::Release);
        let pending = self.queue.snapshot();
        self.hub.update_sync(move |sync| {
            sync.pending_actions = pending;
            sync.last_sync_time = Some(now);
            sync.sync_in_progress = false;
        });

        let report = SyncReport::from_run(synced_count, errors, duration_ms);
        tracing::info!(
            synced = report.synced_count,
            failed = report.failed_count,
            duration_ms = report.duration_ms,
            "sync run finished"
        );
        Ok(report)
    }

    /// Executes a single action, resolving conflicts inline.
    ///
    /// Never returns an error: every failure is captured as a
    /// [`Disposition`] so sibling actions in the batch are unaffected.
    async fn execute_action(&self, action: &OfflineAction, policy: ConflictPolicy) -> Disposition {
        let Some(strategy) = self.registry.resolve(action) else {
            return Disposition::Fatal(
                Error::MissingStrategy(format!("{}/{}", action.kind(), action.entity_kind()))
                    .to_string(),
            );
        };

        match strategy.execute(action, self.repo.as_ref()).await {
            Ok(StrategyOutcome::Applied) | Ok(StrategyOutcome::NoOp) => Disposition::Synced,
            Ok(StrategyOutcome::Conflict { local, remote }) => {
                match self
                    .resolver
                    .resolve(
                        policy,
                        action.kind(),
                        &local,
                        &remote,
                        self.repo.as_ref(),
                        self.cache.as_ref(),
                    )
                    .await
                {
                    Ok(()) => Disposition::Synced,
                    Err(e) => classify(e),
                }
            }
            Err(e) => classify(e),
        }
    }

    /// Best-effort remote pull into the read-through cache.
    async fn pull_modified(&self, since: Option<DateTime<Utc>>) {
        let since = since.unwrap_or(DateTime::UNIX_EPOCH);
        match self.repo.find_modified_since(since).await {
            Ok(photos) => {
                let refreshed = photos.len();
                for photo in photos {
                    self.cache
                        .set(photo_key(&photo.id), CacheValue::Photo(photo), self.cache_ttl);
                }
                self.cache.invalidate_prefix(PHOTO_LIST_PREFIX);
                self.persist_cache();
                tracing::debug!(refreshed, %since, "incremental pull refreshed cache");
            }
            Err(e) => {
                tracing::warn!("incremental pull failed: {e}");
            }
        }
    }

    /// Mirrors the cache into persistence; failures are logged only.
    fn persist_cache(&self) {
        match self.cache.snapshot() {
            Ok(snapshot) => {
                if let Err(e) = self.store.save_cache_snapshot(&snapshot) {
                    tracing::warn!("failed to persist cache snapshot: {e}");
                }
            }
            Err(e) => {
                tracing::warn!("failed to serialize cache snapshot: {e}");
            }
        }
    }
}

fn classify(e: Error) -> Disposition {
    if e.is_retryable() {
        Disposition::Retry(e.to_string())
    } else {
        Disposition::Fatal(e.to_string())
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
