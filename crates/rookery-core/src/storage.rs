//! Storage traits for the persistence collaborator.
//!
//! The pipeline consumes these as `Arc<dyn ...>` handles; implementations
//! are provided by storage backends. An absent row is `Ok(None)`, never an
//! error — `StorageError` is reserved for genuine backend failures.

use async_trait::async_trait;
use thiserror::Error;

use crate::post::Post;
use crate::role::Role;
use crate::user::User;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed or was unreachable.
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// User persistence operations consumed by the identity layer.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetches a user by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Fetches a user by email. Used by token issuance.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Persists changes to an existing user.
    async fn update(&self, user: &User) -> Result<(), StorageError>;
}

/// Role reference-data lookups.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Fetches a role by name. Unknown names are `Ok(None)`.
    async fn get_by_name(&self, name: &str) -> Result<Option<Role>, StorageError>;
}

/// Post persistence operations consumed by the resource-context stage.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Fetches a post by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>, StorageError>;

    /// Persists changes to an existing post.
    async fn update(&self, post: &Post) -> Result<(), StorageError>;

    /// Deletes a post by id. Returns `true` if a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, StorageError>;
}
