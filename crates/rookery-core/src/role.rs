//! Role reference data.
//!
//! Roles are immutable, loaded from the persistence collaborator on demand.
//! Levels form a total order; a higher level means more privilege.

use serde::{Deserialize, Serialize};

/// A named precedence rank in the authorization system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name (e.g. "user", "moderator", "admin").
    pub name: String,

    /// Precedence rank. Comparisons use `>=`.
    pub level: i64,

    /// Human-readable description of the role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Creates a new role with the given name and level.
    #[must_use]
    pub fn new(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            level,
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns `true` if this role ranks at least as high as `other`.
    #[must_use]
    pub fn outranks_or_equals(&self, other: &Role) -> bool {
        self.level >= other.level
    }
}
