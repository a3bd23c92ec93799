//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! Only `DATABASE_URL` is required.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,

    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// Pool size
    pub database_max_connections: u32,

    /// Upper bound on one authoritative quote call
    pub remote_quote_timeout: Duration,

    /// TTL for cached tiers and listing settings
    pub tier_cache_ttl: Duration,

    /// Max cached listings per map
    pub tier_cache_capacity: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".to_string()))?;

        Ok(Config {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            remote_quote_timeout: Duration::from_millis(parse_or(&lookup, "REMOTE_QUOTE_TIMEOUT_MS", "5000")?),
            tier_cache_ttl: Duration::from_secs(parse_or(&lookup, "TIER_CACHE_TTL_SECS", "300")?),
            tier_cache_capacity: parse_or(&lookup, "TIER_CACHE_CAPACITY", "1000")?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
