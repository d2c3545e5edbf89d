//! The ordered middleware pipeline.
//!
//! Stage order per request: rate-limit, authenticate (bearer or basic,
//! never both on one route), resource context, authorization, handler.
//! Each stage either enriches the request scope or terminates with one
//! [`ApiError`] kind; later stages never run after a termination.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rookery_auth::{owner_or_precedence, parse_basic_header};
use rookery_core::{ApiError, User};

use crate::context::{CurrentIdentity, CurrentResource};
use crate::response::{ErrorResponse, unauthorized_basic_response};
use crate::state::AppState;

// =============================================================================
// Stage 1: rate limiting
// =============================================================================

/// Admission check keyed by client address. A rejected request is
/// terminated here and never reaches later stages.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    let (admitted, retry_after) = state.limiter.allow(&key);
    if !admitted {
        tracing::warn!(key = %key, method = %req.method(), path = %req.uri().path(), "request rate limited");
        return ErrorResponse(ApiError::rate_limited(retry_after)).into_response();
    }
    next.run(req).await
}

/// Client identity for rate limiting: the first `x-forwarded-for` entry
/// when present (proxy deployments), otherwise the peer address.
fn client_key(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// =============================================================================
// Stage 2a: bearer-token authentication
// =============================================================================

/// Validates the bearer token and resolves the subject through the
/// cache-aside user lookup, attaching the identity to request scope.
///
/// Every failure — missing header, wrong scheme, bad signature, expired
/// token, unresolvable subject, failed identity lookup — terminates with
/// the same 401; the response never says which check failed.
pub async fn bearer_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    // The request body is !Sync, so the header is taken as an owned value
    // before anything awaits.
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let user = match authenticate_bearer(&state, header.as_deref()).await {
        Ok(user) => user,
        Err(err) => return ErrorResponse(err).into_response(),
    };

    tracing::debug!(user_id = user.id, username = %user.username, "bearer token authenticated");
    req.extensions_mut().insert(CurrentIdentity::new(user));
    next.run(req).await
}

async fn authenticate_bearer(state: &AppState, header: Option<&str>) -> Result<User, ApiError> {
    let header =
        header.ok_or_else(|| ApiError::unauthenticated("authorization header is missing"))?;

    let token = header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthenticated("authorization header is malformed"))?;

    let claims = state
        .authenticator
        .validate_token(token)
        .map_err(|e| ApiError::unauthenticated(e.to_string()))?;

    match state.resolve_user(claims.sub).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::unauthenticated(format!(
            "token subject {} is unknown",
            claims.sub
        ))),
        Err(err) => Err(ApiError::unauthenticated(format!(
            "identity resolution failed: {err}"
        ))),
    }
}

// =============================================================================
// Stage 2b: static-credential authentication
// =============================================================================

/// Checks `Authorization: Basic` credentials against the configured
/// single-tenant pair. Failures carry the Basic challenge header.
pub async fn basic_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(header) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return unauthorized_basic_response("authorization header is missing");
    };

    let (user, pass) = match parse_basic_header(header) {
        Ok(credentials) => credentials,
        Err(err) => return unauthorized_basic_response(err.to_string()),
    };

    if !state.basic.matches(&user, &pass) {
        return unauthorized_basic_response("invalid credentials");
    }

    next.run(req).await
}

// =============================================================================
// Stage 3: resource context
// =============================================================================

/// Parses the post id from the route, fetches the post and attaches it to
/// request scope. Malformed id terminates with 400, absent post with 404.
pub async fn post_context(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    mut req: Request,
    next: Next,
) -> Response {
    let id: i64 = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return ErrorResponse(ApiError::malformed("post id must be an integer"))
                .into_response();
        }
    };

    let post = match state.posts.get_by_id(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return ErrorResponse(ApiError::not_found("post")).into_response(),
        Err(err) => return ErrorResponse(ApiError::from(err)).into_response(),
    };

    req.extensions_mut().insert(CurrentResource::new(post));
    next.run(req).await
}

// =============================================================================
// Stage 4: authorization
// =============================================================================

/// The role name a non-owner needs to pass the authorization stage.
#[derive(Debug, Clone, Copy)]
pub struct RequiredRole(pub &'static str);

/// Ownership-or-precedence check for mutation routes.
///
/// The resource owner is always allowed; non-owners need a role ranking
/// at least as high as the required one. A failed role lookup is an
/// internal error, not a 403.
pub async fn authorize_post(
    State((state, required)): State<(AppState, RequiredRole)>,
    req: Request,
    next: Next,
) -> Response {
    let (Some(identity), Some(resource)) = (
        req.extensions().get::<CurrentIdentity>(),
        req.extensions().get::<CurrentResource>(),
    ) else {
        return ErrorResponse(ApiError::internal(
            "authorization stage ran without identity or resource in request scope",
        ))
        .into_response();
    };

    let decision = owner_or_precedence(
        identity.user(),
        resource.post().user_id,
        required.0,
        state.roles.as_ref(),
    )
    .await;

    match decision {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(
                user_id = identity.user().id,
                post_id = resource.post().id,
                required_role = required.0,
                "mutation forbidden"
            );
            ErrorResponse(ApiError::Forbidden).into_response()
        }
        Err(err) => ErrorResponse(ApiError::internal(err.to_string())).into_response(),
    }
}

// =============================================================================
// Ambient: request id
// =============================================================================

/// Ensures each request has an `x-request-id` and mirrors it on the
/// response, preserving an incoming id when present.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    let id_value = req.headers().get(&header_name).cloned().unwrap_or_else(|| {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    });

    req.extensions_mut().insert(id_value.clone());
    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, id_value);
    res
}
