//! Sync Error Types
//!
//! Error taxonomy for the synchronization engine. The orchestrator treats
//! these categories differently:
//!
//! - `Network` - transient; converted into a retry-queue entry and retried on
//!   the next trigger
//! - `NotFound` - a valid state (new user), surfaced only where absence is
//!   not expected
//! - `Permission` - session/user-id mismatch; logged distinctly, still queued
//!   for retry so a refreshed session can recover it
//! - `Storage` / `Serialization` - local faults; reads treat them as absence,
//!   writes are logged and not retried
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across task
//! boundaries.

use thiserror::Error;

/// Errors produced by the sync engine and its collaborators.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network-level failure: connect, timeout, or transport error
    #[error("network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The requested remote record does not exist
    #[error("remote record not found")]
    NotFound,

    /// The remote store rejected the session or user id
    #[error("permission denied: {message}")]
    Permission {
        /// Human-readable error message
        message: String,
    },

    /// The remote store rejected the request for a non-auth reason
    #[error("remote store error: {message}")]
    Remote {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Local database error
    #[error("local storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// JSON serialization or deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new permission error
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Create a new remote-store error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error indicates the network itself is unreachable.
    ///
    /// The connectivity monitor flips to offline only on these errors; an
    /// auth failure or a server-side rejection means the network is fine.
    pub fn is_connectivity_loss(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::remote(format!("malformed response body: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}
