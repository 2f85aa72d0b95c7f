// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for sync operations.
//!
//! Remote failures arrive as [`RemoteError`] values (status/code/message,
//! mirroring what the repository backend reports) and are classified into
//! the [`Error`] taxonomy. Classification determines whether an action is
//! retried or removed from the queue:
//!
//! - Network, Timeout, Server (5xx), RetryableClient (408/429): retryable
//! - Client (other 4xx), ManualResolutionRequired: removed immediately
//! - NotFound: success for update/delete (idempotent), error for reads

use thiserror::Error;

/// All possible errors that can occur in sync operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("client error (status {status}): {message}")]
    Client { status: u16, message: String },

    #[error("retryable client error (status {status}): {message}")]
    RetryableClient { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict detected for entity {0}")]
    Conflict(String),

    #[error("manual conflict resolution required for entity {0}")]
    ManualResolutionRequired(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("no strategy registered for {0}")]
    MissingStrategy(String),

    #[error("action payload does not match its registered strategy: {0}")]
    InvalidAction(String),

    #[error("cannot sync while offline")]
    Offline,

    #[error("a sync run is already in progress")]
    SyncInProgress,
}

/// A specialized Result type for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the failed action should stay queued and be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Timeout(_)
                | Error::Server { .. }
                | Error::RetryableClient { .. }
        )
    }
}

/// Error reported by a remote repository backend.
///
/// Carries the optional HTTP status and backend error code alongside a
/// human-readable message. Converted into [`Error`] for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status code, if the backend reported one.
    pub status: Option<u16>,
    /// Backend-specific error code, if any.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl RemoteError {
    /// Creates a remote error with a status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RemoteError {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// Creates a connectivity-level error (no HTTP status).
    pub fn network(message: impl Into<String>) -> Self {
        RemoteError {
            status: None,
            code: Some("network".to_string()),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        RemoteError {
            status: None,
            code: Some("timeout".to_string()),
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given entity id.
    pub fn not_found(id: impl Into<String>) -> Self {
        RemoteError {
            status: Some(404),
            code: Some("not_found".to_string()),
            message: format!("entity not found: {}", id.into()),
        }
    }

    /// Returns true if this error represents a missing entity.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || self.code.as_deref() == Some("not_found")
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "remote error (status {}): {}", status, self.message),
            None => write!(f, "remote error: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Result type for remote repository calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        if err.is_not_found() {
            return Error::NotFound(err.message);
        }
        match err.status {
            Some(status) if status >= 500 => Error::Server {
                status,
                message: err.message,
            },
            Some(status @ (408 | 429)) => Error::RetryableClient {
                status,
                message: err.message,
            },
            Some(status) if status >= 400 => Error::Client {
                status,
                message: err.message,
            },
            _ => match err.code.as_deref() {
                Some("timeout") => Error::Timeout(err.message),
                _ => Error::Network(err.message),
            },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
