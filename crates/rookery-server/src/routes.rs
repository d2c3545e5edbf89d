//! Router assembly and the thin handlers behind the pipeline.
//!
//! Handler bodies are data-access glue; the interesting work happens in
//! the middleware stages layered here. Stage order is fixed: the rate
//! limiter is the outermost layer, authentication wraps each protected
//! route group, the resource-context and authorization stages wrap the
//! post routes only.

use std::sync::Arc;

use axum::handler::Handler;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router, extract::Path, extract::State};
use rookery_auth::{Claims, verify_password};
use rookery_core::{ApiError, Post, User};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::context::{CurrentIdentity, CurrentResource};
use crate::middleware::{
    RequiredRole, authorize_post, basic_auth, bearer_auth, post_context, rate_limit, request_id,
};
use crate::response::ErrorResponse;
use crate::state::AppState;

/// Builds the complete router with the pipeline layered in order.
pub fn build_router(state: AppState) -> Router {
    let posts = Router::new()
        .route(
            "/v1/posts/{id}",
            get(get_post)
                .patch(update_post.layer(from_fn_with_state(
                    (state.clone(), RequiredRole("moderator")),
                    authorize_post,
                )))
                .delete(delete_post.layer(from_fn_with_state(
                    (state.clone(), RequiredRole("admin")),
                    authorize_post,
                ))),
        )
        .route_layer(from_fn_with_state(state.clone(), post_context))
        .route_layer(from_fn_with_state(state.clone(), bearer_auth));

    let users = Router::new()
        .route("/v1/users/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), bearer_auth));

    let admin = Router::new()
        .route("/v1/users/activate/{id}", put(activate_user))
        .route_layer(from_fn_with_state(state.clone(), basic_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/authentication/token", post(create_token))
        .merge(posts)
        .merge(users)
        .merge(admin)
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        // Outermost: every request is admission-checked before anything else.
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct CreateTokenPayload {
    email: String,
    password: String,
}

/// Issues a token for valid credentials. Unknown email, wrong password
/// and inactive account all produce the same 401.
async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<CreateTokenPayload>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = state
        .users
        .get_by_email(&payload.email)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthenticated("unknown email"))?;

    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::unauthenticated("account has no password"))?;

    let verified = verify_password(stored_hash, &payload.password)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !verified {
        return Err(ApiError::unauthenticated("wrong password").into());
    }
    if !user.is_active {
        return Err(ApiError::unauthenticated("account is not activated").into());
    }

    let claims = Claims::issue(user.id, state.token_lifetime, &state.token_issuer);
    let token = state
        .authenticator
        .generate_token(&claims)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "token issued");
    Ok((StatusCode::CREATED, Json(json!({ "token": token }))))
}

/// Returns the identity the authentication stage resolved.
async fn me(identity: CurrentIdentity) -> Json<User> {
    Json(identity.user().clone())
}

/// Activates a user account and invalidates its cache entry in the same
/// logical operation as the persistent write.
async fn activate_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| ApiError::malformed("user id must be an integer"))?;

    let mut user = state
        .users
        .get_by_id(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("user"))?;

    user.is_active = true;
    state.users.update(&user).await.map_err(ApiError::from)?;
    state.invalidate_user(id).await;

    tracing::info!(user_id = id, "user activated");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_post(resource: CurrentResource) -> Json<Post> {
    Json(resource.post().clone())
}

#[derive(Debug, Deserialize)]
struct UpdatePostPayload {
    title: Option<String>,
    content: Option<String>,
}

async fn update_post(
    State(state): State<AppState>,
    resource: CurrentResource,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<Json<Post>, ErrorResponse> {
    let mut post = resource.post().clone();
    if let Some(title) = payload.title {
        post.title = title;
    }
    if let Some(content) = payload.content {
        post.content = content;
    }

    state.posts.update(&post).await.map_err(ApiError::from)?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    resource: CurrentResource,
) -> Result<StatusCode, ErrorResponse> {
    let deleted = state
        .posts
        .delete(resource.post().id)
        .await
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::not_found("post").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Spawns the periodic sweep that bounds rate-limiter key state.
pub fn spawn_limiter_sweep(state: &AppState, every: std::time::Duration, idle_for: std::time::Duration) {
    let limiter = Arc::clone(&state.limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = limiter.sweep_idle(idle_for);
            if removed > 0 {
                tracing::debug!(removed, "swept idle rate-limiter keys");
            }
        }
    });
}
