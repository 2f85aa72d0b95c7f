// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Execution strategies for replaying actions against the remote store.
//!
//! A strategy knows how to apply one action kind for one entity kind and
//! how to detect conflicts for it. The registry maps the
//! (action kind, entity kind) pair, derived from the action's tagged
//! payload, to a strategy; built-ins cover Create/Update/Delete for
//! photos.
//!
//! Strategy priorities order a sync run: lower values run first, so
//! creates land before updates, and updates before deletes, when queued
//! actions interact.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use eddy_core::{ActionKind, ActionPayload, EntityKind, Error, OfflineAction, Photo, Result};

use crate::repository::RemoteRepository;

/// Result of executing one action against the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// The mutation was applied remotely.
    Applied,
    /// Nothing to do; counts as success (e.g. deleting an entity that is
    /// already gone).
    NoOp,
    /// Local and remote copies diverged; the conflict resolver decides.
    Conflict {
        /// The locally queued value.
        local: Photo,
        /// The current remote value.
        remote: Photo,
    },
}

/// Per (action kind, entity kind) execution logic.
pub trait SyncStrategy: Send + Sync {
    /// Ordering weight within a sync run; lower runs first.
    fn priority(&self) -> u8;

    /// Applies `action` against the remote repository.
    fn execute<'a>(
        &'a self,
        action: &'a OfflineAction,
        repo: &'a dyn RemoteRepository,
    ) -> Pin<Box<dyn Future<Output = Result<StrategyOutcome>> + Send + 'a>>;
}

/// Maps (action kind, entity kind) to an execution strategy.
pub struct StrategyRegistry {
    strategies: HashMap<(ActionKind, EntityKind), Arc<dyn SyncStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        StrategyRegistry {
            strategies: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in photo strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            ActionKind::Create,
            EntityKind::Photo,
            Arc::new(CreatePhotoStrategy),
        );
        registry.register(
            ActionKind::Update,
            EntityKind::Photo,
            Arc::new(UpdatePhotoStrategy),
        );
        registry.register(
            ActionKind::Delete,
            EntityKind::Photo,
            Arc::new(DeletePhotoStrategy),
        );
        registry
    }

    /// Registers (or replaces) a strategy for the given pair.
    pub fn register(
        &mut self,
        kind: ActionKind,
        entity_kind: EntityKind,
        strategy: Arc<dyn SyncStrategy>,
    ) {
        self.strategies.insert((kind, entity_kind), strategy);
    }

    /// Resolves the strategy for an action, if one is registered.
    pub fn resolve(&self, action: &OfflineAction) -> Option<Arc<dyn SyncStrategy>> {
        self.strategies
            .get(&(action.kind(), action.entity_kind()))
            .cloned()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Create: treat an already-existing remote entity as a conflict rather
/// than erroring.
struct CreatePhotoStrategy;

impl SyncStrategy for CreatePhotoStrategy {
    fn priority(&self) -> u8 {
        0
    }

    fn execute<'a>(
        &'a self,
        action: &'a OfflineAction,
        repo: &'a dyn RemoteRepository,
    ) -> Pin<Box<dyn Future<Output = Result<StrategyOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let ActionPayload::CreatePhoto { photo } = &action.payload else {
                return Err(Error::InvalidAction(action.id.clone()));
            };

            match repo.find_by_id(&photo.id).await.map_err(Error::from)? {
                Some(remote) => Ok(StrategyOutcome::Conflict {
                    local: photo.clone(),
                    remote,
                }),
                None => {
                    repo.save(photo).await.map_err(Error::from)?;
                    Ok(StrategyOutcome::Applied)
                }
            }
        })
    }
}

/// Update: a strictly newer remote copy is a conflict; a missing remote
/// entity makes the update a successful no-op.
struct UpdatePhotoStrategy;

impl SyncStrategy for UpdatePhotoStrategy {
    fn priority(&self) -> u8 {
        1
    }

    fn execute<'a>(
        &'a self,
        action: &'a OfflineAction,
        repo: &'a dyn RemoteRepository,
    ) -> Pin<Box<dyn Future<Output = Result<StrategyOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let ActionPayload::UpdatePhoto { photo } = &action.payload else {
                return Err(Error::InvalidAction(action.id.clone()));
            };

            match repo.find_by_id(&photo.id).await.map_err(Error::from)? {
                Some(remote) if remote.updated_at > photo.updated_at => {
                    Ok(StrategyOutcome::Conflict {
                        local: photo.clone(),
                        remote,
                    })
                }
                Some(_) => match repo.update(photo).await {
                    Ok(_) => Ok(StrategyOutcome::Applied),
                    // Deleted between the fetch and the write: already gone
                    Err(e) if e.is_not_found() => Ok(StrategyOutcome::NoOp),
                    Err(e) => Err(e.into()),
                },
                None => Ok(StrategyOutcome::NoOp),
            }
        })
    }
}

/// Delete: not-found means the entity is already gone, which is the
/// outcome the user asked for.
struct DeletePhotoStrategy;

impl SyncStrategy for DeletePhotoStrategy {
    fn priority(&self) -> u8 {
        2
    }

    fn execute<'a>(
        &'a self,
        action: &'a OfflineAction,
        repo: &'a dyn RemoteRepository,
    ) -> Pin<Box<dyn Future<Output = Result<StrategyOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let ActionPayload::DeletePhoto { id } = &action.payload else {
                return Err(Error::InvalidAction(action.id.clone()));
            };

            match repo.delete(id).await {
                Ok(()) => Ok(StrategyOutcome::Applied),
                Err(e) if e.is_not_found() => Ok(StrategyOutcome::NoOp),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
