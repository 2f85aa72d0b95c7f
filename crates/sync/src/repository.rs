// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote repository abstraction.
//!
//! Provides a trait-based seam over the authoritative remote store so the
//! engine can run against:
//! - the application's real API client in production
//! - in-memory fakes for unit testing
//!
//! The engine never sees the transport; repository calls are expected to
//! carry their own timeouts and report failures as [`RemoteError`].

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use eddy_core::{Photo, RemoteResult};

/// Authoritative remote store for photos.
///
/// All methods are fallible and asynchronous; `NotFound` semantics are
/// expressed through [`RemoteResult`] (a 404-classified error) except for
/// `find_by_id`, which reports a missing entity as `Ok(None)`.
pub trait RemoteRepository: Send + Sync {
    /// Creates a new photo remotely.
    fn save<'a>(
        &'a self,
        photo: &'a Photo,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Photo>> + Send + 'a>>;

    /// Updates an existing photo remotely.
    fn update<'a>(
        &'a self,
        photo: &'a Photo,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Photo>> + Send + 'a>>;

    /// Deletes a photo by id.
    fn delete<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + 'a>>;

    /// Fetches a photo by id; `Ok(None)` when the remote has no such
    /// entity.
    fn find_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Photo>>> + Send + 'a>>;

    /// Lists photos modified strictly after `since`.
    fn find_modified_since<'a>(
        &'a self,
        since: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Vec<Photo>>> + Send + 'a>>;
}
