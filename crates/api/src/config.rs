use tutor_core::comment::MAX_COMMENT_LENGTH;
use tutor_core::policy::{
    CommentPolicy, DEFAULT_FLAG_THRESHOLD, DEFAULT_PAGE_SIZE, DEFAULT_RATE_LIMIT,
    DEFAULT_RATE_WINDOW_SECS, MAX_PAGE_SIZE,
};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Flag threshold, paging and rate limits for comments.
    pub comments: CommentPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `COMMENT_FLAG_THRESHOLD`   | `5`                        |
    /// | `COMMENT_PAGE_SIZE`        | `50`                       |
    /// | `COMMENT_MAX_PAGE_SIZE`    | `100`                      |
    /// | `COMMENT_MAX_LENGTH`       | `1000`                     |
    /// | `COMMENT_RATE_LIMIT`       | `10`                       |
    /// | `COMMENT_RATE_WINDOW_SECS` | `60`                       |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or an inconsistent comment policy.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let comments = CommentPolicy {
            flag_threshold: env_or("COMMENT_FLAG_THRESHOLD", DEFAULT_FLAG_THRESHOLD),
            default_page_size: env_or("COMMENT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            max_page_size: env_or("COMMENT_MAX_PAGE_SIZE", MAX_PAGE_SIZE),
            max_length: env_or("COMMENT_MAX_LENGTH", MAX_COMMENT_LENGTH),
            rate_limit: env_or("COMMENT_RATE_LIMIT", DEFAULT_RATE_LIMIT),
            rate_window_secs: env_or("COMMENT_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW_SECS),
        };
        if let Err(e) = comments.validate() {
            panic!("Invalid comment configuration: {e}");
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            comments,
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
