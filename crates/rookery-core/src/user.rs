//! The identity resolved by the authentication stage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::role::Role;

fn default_datetime() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A user in the identity system.
///
/// Owned by the persistence collaborator; the user cache holds a
/// time-bounded copy. Invariant: `role` always carries a defined
/// precedence rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique numeric identifier. Round-trips through token subjects
    /// without precision loss.
    pub id: i64,

    /// Username for display and lookups.
    pub username: String,

    /// Email address, unique per user; used for token issuance.
    pub email: String,

    /// The user's precedence role.
    pub role: Role,

    /// Argon2 password hash (`None` for externally provisioned users).
    ///
    /// Never serialized; credential checks happen server-side only.
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// Whether the account is activated. Inactive users cannot obtain
    /// tokens.
    #[serde(default)]
    pub is_active: bool,

    /// When the user was created.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Creates a new active user with the given id, username and email.
    #[must_use]
    pub fn new(id: i64, username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            role,
            password_hash: None,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the stored password hash.
    #[must_use]
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Marks the account as not yet activated.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns `true` if this user owns the given resource owner id.
    #[must_use]
    pub fn owns(&self, owner_id: i64) -> bool {
        self.id == owner_id
    }
}
