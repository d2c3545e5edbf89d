//! Authentication and authorization error types.

use thiserror::Error;

/// Convenience alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is invalid, malformed, expired, or carries the wrong
    /// issuer or audience. One variant for all validation failures so
    /// callers cannot distinguish which check failed.
    #[error("invalid token: {message}")]
    InvalidToken {
        /// Server-side detail; not exposed to clients.
        message: String,
    },

    /// The request lacks valid credentials.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of the missing or rejected credential.
        message: String,
    },

    /// The named precedence role does not exist.
    #[error("role not found: {name}")]
    RoleNotFound {
        /// The unknown role name.
        name: String,
    },

    /// A storage lookup failed while resolving auth data.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// An unexpected internal failure (e.g. signing).
    #[error("internal auth error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `RoleNotFound` error.
    #[must_use]
    pub fn role_not_found(name: impl Into<String>) -> Self {
        Self::RoleNotFound { name: name.into() }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
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

    /// Returns `true` if the failure means the credential was rejected
    /// (as opposed to a collaborator failing).
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::Unauthorized { .. }
        )
    }
}

impl From<rookery_core::StorageError> for AuthError {
    fn from(err: rookery_core::StorageError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}
