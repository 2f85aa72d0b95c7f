// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between diverged local and remote copies.
//!
//! Invoked by the reconciler when a strategy reports a conflict. Behavior
//! by policy:
//!
//! - `ClientWins`: force-write the local value, ignoring the remote
//! - `ServerWins`: drop the local change; refresh the cache from remote
//! - `Merge`: caller-supplied merge function, or the default photo field
//!   rule; the merged value is written remotely and into the cache
//! - `Manual`: the supplied resolver applied like `Merge`; with none
//!   supplied the action fails with `ManualResolutionRequired` and the
//!   rest of the batch continues

use std::sync::Arc;

use chrono::Duration;
use eddy_core::{
    photo_key, ActionKind, CacheValue, ConflictPolicy, Error, Photo, Result, TtlCache,
};

use crate::repository::RemoteRepository;

/// Caller-supplied merge function for the `Merge` and `Manual` policies.
///
/// Receives (local, remote) and returns the value to keep.
pub type MergeFn = Arc<dyn Fn(&Photo, &Photo) -> Photo + Send + Sync>;

/// Applies the active conflict policy to a diverged photo.
pub struct ConflictResolver {
    merge_fn: Option<MergeFn>,
    cache_ttl: Duration,
}

impl ConflictResolver {
    /// Creates a resolver with no custom merge function.
    pub fn new(cache_ttl: Duration) -> Self {
        ConflictResolver {
            merge_fn: None,
            cache_ttl,
        }
    }

    /// Creates a resolver with a caller-supplied merge function, used by
    /// the `Merge` and `Manual` policies.
    pub fn with_merge_fn(cache_ttl: Duration, merge_fn: MergeFn) -> Self {
        ConflictResolver {
            merge_fn: Some(merge_fn),
            cache_ttl,
        }
    }

    /// Resolves one conflict under `policy`.
    ///
    /// On success the action counts as synced; an error is classified by
    /// the reconciler like any other execution failure.
    pub async fn resolve(
        &self,
        policy: ConflictPolicy,
        kind: ActionKind,
        local: &Photo,
        remote: &Photo,
        repo: &dyn RemoteRepository,
        cache: &TtlCache<CacheValue>,
    ) -> Result<()> {
        tracing::debug!(entity = %local.id, %kind, ?policy, "resolving conflict");

        match policy {
            ConflictPolicy::ClientWins => {
                self.force_write(local, repo).await?;
                Ok(())
            }
            ConflictPolicy::ServerWins => {
                cache.set(
                    photo_key(&remote.id),
                    CacheValue::Photo(remote.clone()),
                    self.cache_ttl,
                );
                Ok(())
            }
            ConflictPolicy::Merge => {
                let merged = self.merge(local, remote);
                self.force_write(&merged, repo).await?;
                cache.set(
                    photo_key(&merged.id),
                    CacheValue::Photo(merged),
                    self.cache_ttl,
                );
                Ok(())
            }
            ConflictPolicy::Manual => match &self.merge_fn {
                Some(resolve) => {
                    let resolved = resolve(local, remote);
                    self.force_write(&resolved, repo).await?;
                    cache.set(
                        photo_key(&resolved.id),
                        CacheValue::Photo(resolved),
                        self.cache_ttl,
                    );
                    Ok(())
                }
                None => Err(Error::ManualResolutionRequired(local.id.clone())),
            },
        }
    }

    fn merge(&self, local: &Photo, remote: &Photo) -> Photo {
        match &self.merge_fn {
            Some(f) => f(local, remote),
            None => Photo::merged(local, remote),
        }
    }

    /// Writes `photo` remotely, ignoring the remote's current version.
    ///
    /// Falls back to save when the entity vanished between conflict
    /// detection and the write.
    async fn force_write(&self, photo: &Photo, repo: &dyn RemoteRepository) -> Result<()> {
        match repo.update(photo).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                repo.save(photo).await.map_err(Error::from)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
