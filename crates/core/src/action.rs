// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued offline mutations.
//!
//! Every local mutation made while offline is captured as an
//! [`OfflineAction`] holding a typed payload. The payload is a tagged
//! union, so the (action kind, entity kind) pair used for strategy lookup
//! is derived from the variant and can never disagree with the data it
//! carries. Actions are designed to be:
//!
//! - Serializable: persisted as JSON across restarts
//! - Replayable: applied against the remote store in a later sync run
//! - Bounded: removed after success or `max_retries` failed attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::photo::Photo;

/// The kind of mutation an action performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// The kind of entity an action targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Photo,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Photo => write!(f, "photo"),
        }
    }
}

/// Payload describing the specific mutation being performed.
///
/// One variant per (action kind, entity kind) pair, so strategies can
/// deserialize safely rather than trusting untyped data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Create a new photo.
    CreatePhoto { photo: Photo },

    /// Update an existing photo.
    UpdatePhoto { photo: Photo },

    /// Delete a photo by id.
    DeletePhoto { id: String },
}

impl ActionPayload {
    /// Creates a CreatePhoto payload.
    pub fn create_photo(photo: Photo) -> Self {
        ActionPayload::CreatePhoto { photo }
    }

    /// Creates an UpdatePhoto payload.
    pub fn update_photo(photo: Photo) -> Self {
        ActionPayload::UpdatePhoto { photo }
    }

    /// Creates a DeletePhoto payload.
    pub fn delete_photo(id: impl Into<String>) -> Self {
        ActionPayload::DeletePhoto { id: id.into() }
    }

    /// Returns the action kind encoded by this payload.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CreatePhoto { .. } => ActionKind::Create,
            ActionPayload::UpdatePhoto { .. } => ActionKind::Update,
            ActionPayload::DeletePhoto { .. } => ActionKind::Delete,
        }
    }

    /// Returns the entity kind this payload targets.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ActionPayload::CreatePhoto { .. }
            | ActionPayload::UpdatePhoto { .. }
            | ActionPayload::DeletePhoto { .. } => EntityKind::Photo,
        }
    }

    /// Returns the id of the entity affected by this payload.
    pub fn entity_id(&self) -> &str {
        match self {
            ActionPayload::CreatePhoto { photo } => &photo.id,
            ActionPayload::UpdatePhoto { photo } => &photo.id,
            ActionPayload::DeletePhoto { id } => id,
        }
    }

    /// Returns the photo carried by this payload, if any.
    pub fn photo(&self) -> Option<&Photo> {
        match self {
            ActionPayload::CreatePhoto { photo } | ActionPayload::UpdatePhoto { photo } => {
                Some(photo)
            }
            ActionPayload::DeletePhoto { .. } => None,
        }
    }
}

/// A queued local mutation awaiting remote application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineAction {
    /// Opaque unique identifier for this action.
    pub id: String,
    /// The mutation being performed.
    pub payload: ActionPayload,
    /// When the action was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// How many times execution has failed so far.
    pub retry_count: u32,
    /// How many failed attempts remove the action from the queue.
    pub max_retries: u32,
}

impl OfflineAction {
    /// Creates a fresh action with a zero retry count.
    pub fn new(
        id: impl Into<String>,
        payload: ActionPayload,
        enqueued_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Self {
        OfflineAction {
            id: id.into(),
            payload,
            enqueued_at,
            retry_count: 0,
            max_retries,
        }
    }

    /// Returns the action kind.
    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// Returns the entity kind this action targets.
    pub fn entity_kind(&self) -> EntityKind {
        self.payload.entity_kind()
    }

    /// Returns the id of the entity affected by this action.
    pub fn entity_id(&self) -> &str {
        self.payload.entity_id()
    }

    /// Returns true once the retry budget is spent.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Generate an action id from the target entity, enqueue time, and a
/// per-process sequence number.
///
/// Format: `act-{hash}` where hash is the first 8 hex chars of
/// SHA256(entity_id + timestamp + seq). The sequence number keeps ids
/// unique when the same entity is mutated twice within one clock tick.
pub fn generate_action_id(entity_id: &str, enqueued_at: &DateTime<Utc>, seq: u64) -> String {
    let input = format!("{}{}{}", entity_id, enqueued_at.to_rfc3339(), seq);
    let hash = Sha256::digest(input.as_bytes());
    format!("act-{}", hex::encode(&hash[..4]))
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
