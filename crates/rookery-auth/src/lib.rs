//! Authentication and authorization for the Rookery gateway.
//!
//! Provides the stateless JWT authenticator, the HTTP Basic credential
//! check, argon2 password helpers and the role-precedence policy used by
//! the middleware pipeline.

pub mod basic;
pub mod error;
pub mod jwt;
pub mod password;
pub mod precedence;

pub use basic::{BasicCredentials, parse_basic_header};
pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtAuthenticator};
pub use password::{hash_password, verify_password};
pub use precedence::{has_precedence, owner_or_precedence};
