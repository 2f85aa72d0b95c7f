// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Photo entity and the default field-level merge rule.
//!
//! Merge rule for diverged copies:
//! - identity/location fields (`id`, `storage_ref`, `created_at`) always
//!   come from the remote copy
//! - mutable fields (`title`, `description`, `tags`) come from whichever
//!   side carries the newer `updated_at`; ties go to the remote copy
//! - the merged `updated_at` is the maximum of both sides

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A photo record as the application stores it remotely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    /// Unique identifier.
    pub id: String,
    /// User-visible title.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// User-assigned tags.
    pub tags: Vec<String>,
    /// Reference into blob storage for the image bytes.
    pub storage_ref: String,
    /// When the photo was first created.
    pub created_at: DateTime<Utc>,
    /// When the photo was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Creates a photo with the given id, title and storage reference.
    ///
    /// Both timestamps are set to `at`; tags and description start empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        storage_ref: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Photo {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            storage_ref: storage_ref.into(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Merges a diverged local and remote copy of the same photo.
    ///
    /// Applies the default field-level rule documented at module level.
    /// Used by the merge conflict policy when no custom merge function is
    /// supplied.
    pub fn merged(local: &Photo, remote: &Photo) -> Photo {
        let newer = if local.updated_at > remote.updated_at {
            local
        } else {
            remote
        };

        Photo {
            id: remote.id.clone(),
            storage_ref: remote.storage_ref.clone(),
            created_at: remote.created_at,
            title: newer.title.clone(),
            description: newer.description.clone(),
            tags: newer.tags.clone(),
            updated_at: local.updated_at.max(remote.updated_at),
        }
    }
}

#[cfg(test)]
#[path = "photo_tests.rs"]
mod tests;
