//! Application configuration.
//!
//! Serde-default structs validated by [`AppConfig::validate`]; loaded from
//! an optional TOML file plus `ROOKERY_`-prefixed environment variables
//! (double underscore as the section separator, e.g.
//! `ROOKERY_RATE_LIMITER__REQUESTS_PER_WINDOW=50`).

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token and basic-auth configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Ingress rate limiting.
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    /// User cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error, off.
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub basic: BasicAuthConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

/// Single-tenant credentials for the static-credential variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    #[serde(default = "default_basic_user")]
    pub user: String,
    #[serde(default = "default_basic_pass")]
    pub pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HS256 signing secret.
    #[serde(default = "default_token_secret")]
    pub secret: String,
    /// Expected issuer; issued tokens also use it as the audience.
    #[serde(default = "default_token_issuer")]
    pub issuer: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_lifetime_secs")]
    pub lifetime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Admissions allowed per key per window. 0 disables the limiter.
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    /// Fixed window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cached-entry lifetime in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_basic_user() -> String {
    "admin".to_string()
}
fn default_basic_pass() -> String {
    "admin".to_string()
}
fn default_token_secret() -> String {
    "change-me-in-production".to_string()
}
fn default_token_issuer() -> String {
    "rookery".to_string()
}
fn default_token_lifetime_secs() -> u64 {
    // 48 hours
    48 * 3600
}
fn default_true() -> bool {
    true
}
fn default_requests_per_window() -> u32 {
    20
}
fn default_window_secs() -> u64 {
    5
}
fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            user: default_basic_user(),
            pass: default_basic_pass(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: default_token_secret(),
            issuer: default_token_issuer(),
            lifetime_secs: default_token_lifetime_secs(),
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the given TOML file (optional) and the
    /// environment.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ROOKERY").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.auth.token.secret.is_empty() {
            return Err("auth.token.secret must not be empty".into());
        }
        if self.auth.token.lifetime_secs == 0 {
            return Err("auth.token.lifetime_secs must be > 0".into());
        }
        if self.rate_limiter.window_secs == 0 {
            return Err("rate_limiter.window_secs must be > 0".into());
        }
        // rate_limiter.requests_per_window == 0 is allowed: it means
        // "disabled", never "always reject".
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0 when the cache is enabled".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.rate_limiter.window_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn token_lifetime(&self) -> time::Duration {
        time::Duration::seconds(self.auth.token.lifetime_secs as i64)
    }
}
