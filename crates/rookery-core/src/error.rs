//! The error taxonomy every pipeline stage converts into before terminating
//! a request. No raw collaborator error is allowed to cross the pipeline
//! boundary; each stage maps its failures to exactly one of these kinds.

use std::time::Duration;

use thiserror::Error;

use crate::storage::StorageError;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Terminal request outcomes produced by the traffic-control and identity
/// pipeline.
///
/// The externally visible message for `Unauthenticated` is always the same
/// regardless of which check failed; the detail field is for server-side
/// logging only.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client exceeded its admission quota for the current window.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        /// Advisory hint until the current window rolls over.
        retry_after: Duration,
    },

    /// Missing, malformed, expired or otherwise invalid credentials.
    #[error("unauthorized")]
    Unauthenticated {
        /// Server-side detail; never serialized to the client.
        detail: String,
    },

    /// Authenticated, but neither the resource owner nor of sufficient rank.
    #[error("forbidden")]
    Forbidden,

    /// The requested resource or reference data does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up (resource kind or role name).
        what: String,
    },

    /// The request carried unparseable input (e.g. a non-numeric id).
    #[error("malformed request: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// An unexpected collaborator failure. Logged with full context,
    /// surfaced to the caller as a generic message.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl ApiError {
    /// Creates a new `RateLimited` error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::Unauthenticated {
            detail: detail.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is attributable to the client.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}
