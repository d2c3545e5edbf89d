//! Cache-aside user cache.
//!
//! The cache is never the system of record; entries may be dropped or
//! expire at any time with no correctness impact beyond latency. The
//! read-through policy (miss, fetch, set) lives in
//! [`crate::state::AppState::resolve_user`]; invalidation on user mutation
//! lives with the mutating handler.
//!
//! Disabled-cache mode is a separate no-op implementation behind the same
//! trait, selected once at construction — call sites never branch on an
//! "enabled" flag.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use rookery_core::User;
use thiserror::Error;

/// Errors surfaced by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed.
    #[error("cache backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Time-bounded cached copy of a user.
#[derive(Debug, Clone)]
struct CachedEntry {
    user: User,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(user: User, ttl: Duration) -> Self {
        Self {
            user,
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Cache contract for the hot user entity.
///
/// A miss is `Ok(None)`, distinct from a lookup failure. `set`
/// unconditionally overwrites with a fresh TTL. `delete` is best-effort
/// invalidation and must never fail the calling operation.
#[async_trait]
pub trait UserCache: Send + Sync {
    /// Looks up a cached user by id.
    async fn get(&self, id: i64) -> Result<Option<User>, CacheError>;

    /// Stores a fresh copy, replacing any existing entry.
    async fn set(&self, user: &User) -> Result<(), CacheError>;

    /// Invalidates the entry for `id`, if any.
    async fn delete(&self, id: i64);
}

/// Process-local cache backed by a `DashMap` with per-entry TTL.
pub struct DashMapUserCache {
    entries: DashMap<i64, CachedEntry>,
    ttl: Duration,
}

impl DashMapUserCache {
    /// Creates a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl UserCache for DashMapUserCache {
    async fn get(&self, id: i64) -> Result<Option<User>, CacheError> {
        match self.entries.get(&id) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.user.clone())),
            Some(entry) => {
                drop(entry);
                self.entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        self.entries
            .insert(user.id, CachedEntry::new(user.clone(), self.ttl));
        Ok(())
    }

    async fn delete(&self, id: i64) {
        self.entries.remove(&id);
        tracing::debug!(user_id = id, "user cache entry invalidated");
    }
}

/// Disabled-cache mode: every read goes straight to persistence.
pub struct NoopUserCache;

#[async_trait]
impl UserCache for NoopUserCache {
    async fn get(&self, _id: i64) -> Result<Option<User>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _user: &User) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _id: i64) {}
}
