//! The Rookery gateway server.
//!
//! Composes the fixed-window rate limiter, the bearer/basic authentication
//! stages, cache-aside identity resolution and role-precedence
//! authorization into an ordered axum middleware pipeline.

pub mod cache;
pub mod config;
pub mod context;
pub mod limiter;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use routes::build_router;
pub use state::AppState;
