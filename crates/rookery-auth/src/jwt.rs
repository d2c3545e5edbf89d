//! JWT token generation and validation.
//!
//! Tokens are HS256-signed and entirely self-contained: validity is a
//! function of the signature and the embedded timestamps only, there is no
//! server-side token state or revocation list.
//!
//! The claims struct is typed with an `i64` subject so identity ids
//! round-trip exactly; no claim ever passes through a floating-point
//! representation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::AuthError;

/// Registered claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity id. Numeric, preserved exactly.
    pub sub: i64,

    /// Issued-at (Unix timestamp).
    pub iat: i64,

    /// Not-before (Unix timestamp).
    pub nbf: i64,

    /// Expiration (Unix timestamp).
    pub exp: i64,

    /// Issuer.
    pub iss: String,

    /// Audience. Issued tokens use the issuer as audience.
    pub aud: String,
}

impl Claims {
    /// Builds the claim set issued for `subject` with the configured
    /// lifetime: `{sub, iat: now, nbf: now, exp: now + lifetime,
    /// iss: issuer, aud: issuer}`.
    #[must_use]
    pub fn issue(subject: i64, lifetime: Duration, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            sub: subject,
            iat: now,
            nbf: now,
            exp: now + lifetime.whole_seconds(),
            iss: issuer.clone(),
            aud: issuer,
        }
    }
}

/// Stateless HS256 token authenticator.
///
/// A single secret and a single expected issuer/audience pair; no refresh
/// or rotation mechanism.
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates an authenticator from a shared secret and the expected
    /// issuer and audience.
    #[must_use]
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.validate_nbf = true;
        // `sub` is not listed here: the library's required-claim check
        // parses it as a string, and ours is numeric. Presence and type
        // are enforced by deserializing into the typed claims struct.
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs the claim set. Fails only if signing itself fails, which is
    /// treated as an internal error.
    pub fn generate_token(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
    }

    /// Verifies signature, issuer, audience and the time bounds.
    ///
    /// Every failure maps to the same `InvalidToken` kind; the reason is
    /// kept server-side only.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token validation failed");
                AuthError::invalid_token(e.to_string())
            })
    }
}
