//! API server configuration.

use std::time::Duration;

use hub_core::auth::jwt::resolve_jwt_secret;
use hub_core::llm::LlmConfig;

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/service_hub";

/// Default pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Mark session cookies `Secure`.
    pub secure_cookies: bool,
    /// Hosted model settings.
    pub llm: LlmConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable             | Default                                  |
    /// |----------------------|------------------------------------------|
    /// | `BIND_ADDR`          | `127.0.0.1:8000`                         |
    /// | `DATABASE_URL`       | `postgres://localhost:5432/service_hub`  |
    /// | `DB_MAX_CONNECTIONS` | `5`                                      |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file    |
    /// | `COOKIE_SECURE`      | `false`                                  |
    ///
    /// Model settings are read by [`LlmConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            jwt_secret: resolve_jwt_secret(),
            secure_cookies: std::env::var("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            llm: LlmConfig::from_env(),
        }
    }

    /// Upper bound on one task's model call.
    pub fn task_timeout(&self) -> Duration {
        self.llm.timeout
    }
}
