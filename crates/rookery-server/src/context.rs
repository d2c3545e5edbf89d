//! Typed request-scoped context.
//!
//! Pipeline stages attach the resolved identity and resource to request
//! extensions wrapped in these newtypes; handlers consume them through
//! the extractors instead of a dynamically-typed bag. A missing value is
//! a wiring bug (a route forgot a stage), reported as an internal error.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rookery_core::{ApiError, Post, User};

use crate::response::ErrorResponse;

/// The identity resolved by the authentication stage.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Arc<User>);

impl CurrentIdentity {
    /// Creates the extension value from a resolved user.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self(Arc::new(user))
    }

    /// The resolved user.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentIdentity>().cloned().ok_or_else(|| {
            ErrorResponse(ApiError::internal(
                "identity missing from request scope: route is not behind the authentication stage",
            ))
        })
    }
}

/// The resource resolved by the resource-context stage.
#[derive(Debug, Clone)]
pub struct CurrentResource(pub Arc<Post>);

impl CurrentResource {
    /// Creates the extension value from a fetched post.
    #[must_use]
    pub fn new(post: Post) -> Self {
        Self(Arc::new(post))
    }

    /// The resolved post.
    #[must_use]
    pub fn post(&self) -> &Post {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentResource
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentResource>().cloned().ok_or_else(|| {
            ErrorResponse(ApiError::internal(
                "resource missing from request scope: route is not behind the resource-context stage",
            ))
        })
    }
}
