//! Shared application state for the pipeline.

use std::sync::Arc;

use rookery_auth::{BasicCredentials, JwtAuthenticator};
use rookery_core::{ApiError, MemoryStorage, PostStore, RoleStore, User, UserStore};

use crate::cache::{DashMapUserCache, NoopUserCache, UserCache};
use crate::config::AppConfig;
use crate::limiter::FixedWindowLimiter;

/// Everything the middleware stages and handlers share.
///
/// The cache and limiter implementations are chosen once here, at
/// construction: a disabled cache becomes [`NoopUserCache`] and a disabled
/// limiter a zero-limit [`FixedWindowLimiter`], so no call site ever
/// branches on an "enabled" flag.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub posts: Arc<dyn PostStore>,
    pub user_cache: Arc<dyn UserCache>,
    pub authenticator: Arc<JwtAuthenticator>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub basic: BasicCredentials,
    pub token_issuer: String,
    pub token_lifetime: time::Duration,
}

impl AppState {
    /// Wires the state from configuration and storage handles.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        let user_cache: Arc<dyn UserCache> = if config.cache.enabled {
            Arc::new(DashMapUserCache::new(config.cache_ttl()))
        } else {
            Arc::new(NoopUserCache)
        };

        let limit = if config.rate_limiter.enabled {
            config.rate_limiter.requests_per_window
        } else {
            0
        };

        let token = &config.auth.token;
        Self {
            users,
            roles,
            posts,
            user_cache,
            authenticator: Arc::new(JwtAuthenticator::new(
                &token.secret,
                &token.issuer,
                &token.issuer,
            )),
            limiter: Arc::new(FixedWindowLimiter::new(limit, config.window())),
            basic: BasicCredentials::new(&config.auth.basic.user, &config.auth.basic.pass),
            token_issuer: token.issuer.clone(),
            token_lifetime: config.token_lifetime(),
        }
    }

    /// Convenience wiring for the in-memory backend (tests, single-binary
    /// deployments).
    #[must_use]
    pub fn with_memory_storage(config: &AppConfig, storage: Arc<MemoryStorage>) -> Self {
        Self::new(config, storage.clone(), storage.clone(), storage)
    }

    /// Cache-aside identity resolution.
    ///
    /// Checks the cache first; on a miss fetches from persistence and
    /// populates the cache before returning. Two concurrent misses may
    /// both fetch and both set — they converge to the same value, costing
    /// only a redundant persistence read.
    pub async fn resolve_user(&self, id: i64) -> Result<Option<User>, ApiError> {
        if let Some(user) = self
            .user_cache
            .get(id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
        {
            tracing::debug!(user_id = id, "user cache hit");
            return Ok(Some(user));
        }

        let Some(user) = self.users.get_by_id(id).await? else {
            return Ok(None);
        };

        self.user_cache
            .set(&user)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        Ok(Some(user))
    }

    /// Best-effort cache invalidation after a user mutation. Failure to
    /// invalidate must not fail the mutation, so this only logs.
    pub async fn invalidate_user(&self, id: i64) {
        self.user_cache.delete(id).await;
    }
}
