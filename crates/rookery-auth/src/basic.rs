//! HTTP Basic credential parsing and checking.
//!
//! The static-credential variant of the authentication stage: a single
//! configured user/password pair, typically protecting operational
//! endpoints.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::AuthError;

/// Configured single-tenant Basic Auth credentials.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    /// Expected username.
    pub user: String,

    /// Expected password.
    pub pass: String,
}

impl BasicCredentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Checks a presented user/password pair against the configuration.
    #[must_use]
    pub fn matches(&self, user: &str, pass: &str) -> bool {
        self.user == user && self.pass == pass
    }
}

/// Parses an `Authorization: Basic <base64(user:pass)>` header value.
///
/// Any malformation (wrong scheme, bad base64, missing colon) is rejected
/// with `Unauthorized`; the detail stays server-side.
pub fn parse_basic_header(header: &str) -> Result<(String, String), AuthError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or_else(|| AuthError::unauthorized("authorization header is malformed"))?;

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::unauthorized("invalid base64 in authorization header"))?;

    let credentials = String::from_utf8(decoded)
        .map_err(|_| AuthError::unauthorized("invalid utf-8 in decoded credentials"))?;

    let (user, pass) = credentials
        .split_once(':')
        .ok_or_else(|| AuthError::unauthorized("credentials must be user:pass"))?;

    Ok((user.to_string(), pass.to_string()))
}
