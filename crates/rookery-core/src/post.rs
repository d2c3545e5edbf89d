//! The resource attached by the resource-context stage.
//!
//! Only the post's identity and owner id matter to the pipeline; the rest
//! is payload carried for handlers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

fn default_datetime() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A post owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique numeric identifier, parsed from the route.
    pub id: i64,

    /// Owner's user id. Drives the ownership short-circuit in the
    /// authorization stage.
    pub user_id: i64,

    /// Post title.
    pub title: String,

    /// Post body.
    pub content: String,

    /// When the post was created.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Post {
    /// Creates a new post.
    #[must_use]
    pub fn new(
        id: i64,
        user_id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            content: content.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
