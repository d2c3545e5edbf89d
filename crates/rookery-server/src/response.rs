//! Terminal response shapes for pipeline errors.
//!
//! Every stage converts its failures into [`ApiError`] before terminating;
//! this module maps each kind to exactly one status code and a uniform
//! JSON error envelope. Internal detail is logged here and never
//! serialized.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use rookery_core::ApiError;
use serde_json::json;

/// Newtype making [`ApiError`] usable as an axum rejection / handler error.
#[derive(Debug)]
pub struct ErrorResponse(pub ApiError);

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            ApiError::RateLimited { retry_after } => {
                let secs = retry_after.as_secs().max(1);
                tracing::warn!(retry_after_secs = secs, "rate limit exceeded");
                let mut res = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": format!("rate limit exceeded, retry after: {secs}s") })),
                )
                    .into_response();
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                res
            }
            ApiError::Unauthenticated { detail } => {
                tracing::warn!(detail = %detail, "unauthorized request");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "unauthorized" })),
                )
                    .into_response()
            }
            ApiError::Forbidden => {
                tracing::warn!("forbidden request");
                (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
            }
            ApiError::NotFound { what } => {
                tracing::debug!(what = %what, "not found");
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
            ApiError::Malformed { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Internal { message } => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "the server encountered a problem" })),
                )
                    .into_response()
            }
        }
    }
}

/// 401 carrying the Basic challenge, used by the static-credential stage.
pub fn unauthorized_basic_response(detail: impl Into<String>) -> Response {
    let mut res = ErrorResponse(ApiError::unauthenticated(detail)).into_response();
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="restricted", charset="UTF-8""#),
    );
    res
}
