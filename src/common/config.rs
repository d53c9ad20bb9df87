// src/common/config.rs
//! Environment-driven configuration consumed at startup

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::services::rate_limit::RateLimitConfig;

/// Connection parameters for one store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Remote-to-local recommendation sync tuning
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub window_days: i64,
    pub page_size: i64,
    pub cache_ttl_hours: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            page_size: 100,
            cache_ttl_hours: 24,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_days: parse_or("SYNC_WINDOW_DAYS", defaults.window_days),
            page_size: parse_or("SYNC_PAGE_SIZE", defaults.page_size),
            cache_ttl_hours: parse_or("CACHE_TTL_HOURS", defaults.cache_ttl_hours),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub local_db: StoreConfig,
    /// `None` disables the remote store entirely
    pub remote_db: Option<StoreConfig>,
    pub remote_bootstrap_schema: bool,
    pub reset_db: bool,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub google_client_id: Option<String>,
    pub onboarding_password: String,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub rate_limit_purge_interval: Duration,
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let acquire_timeout = Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 30u64));

        let local_db = StoreConfig {
            url: env::var("LOCAL_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://newsly_local.db".to_string()),
            min_connections: parse_or("LOCAL_DB_MIN_CONNECTIONS", 2),
            max_connections: parse_or("LOCAL_DB_MAX_CONNECTIONS", 20),
            acquire_timeout,
        };

        let remote_db = non_empty_var("REMOTE_DATABASE_URL").map(|url| StoreConfig {
            url,
            min_connections: parse_or("REMOTE_DB_MIN_CONNECTIONS", 1),
            max_connections: parse_or("REMOTE_DB_MAX_CONNECTIONS", 10),
            acquire_timeout,
        });

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:3001".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            local_db,
            remote_db,
            remote_bootstrap_schema: flag("REMOTE_BOOTSTRAP_SCHEMA"),
            reset_db: flag("RESET_DB"),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "replace_with_strong_secret".to_string()),
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", 10080),
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            onboarding_password: env::var("ONBOARDING_PASSWORD")
                .unwrap_or_else(|_| "I like apples".to_string()),
            cors_origins,
            port: parse_or("PORT", 8002),
            rate_limit: RateLimitConfig::from_env(),
            rate_limit_purge_interval: nonzero_secs("RATE_LIMIT_PURGE_INTERVAL_SECS", 300),
            sync: SyncConfig::from_env(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse an env var, falling back to `default` when unset or malformed
pub fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, value = %raw, error = %e, default = %default, "Invalid config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// A duration in seconds from env; zero is rejected in favour of `default`
pub fn nonzero_secs(key: &str, default: u64) -> Duration {
    match parse_or(key, default) {
        0 => {
            warn!(key = %key, default = %default, "Zero interval is not allowed, using default");
            Duration::from_secs(default)
        }
        secs => Duration::from_secs(secs),
    }
}
