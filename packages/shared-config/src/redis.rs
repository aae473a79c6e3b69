//! Redis configuration types

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_REDIS_URL, REDIS_URL};
use crate::{env_or_default, parse_env_from, validate_url, ConfigError, ConfigResult, EnvProvider};

/// Redis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,
}

impl RedisConfig {
    /// Load Redis configuration from an environment provider
    pub fn from_provider(env: &impl EnvProvider) -> ConfigResult<Self> {
        let url = env_or_default(env, REDIS_URL, DEFAULT_REDIS_URL);
        let parsed = validate_url(REDIS_URL, &url)?;
        if !matches!(parsed.scheme(), "redis" | "rediss") {
            return Err(ConfigError::InvalidUrl(
                REDIS_URL.to_string(),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        Ok(Self {
            url,
            pool_size: parse_env_from(env, "REDIS_POOL_SIZE", 10)?,
        })
    }

    /// Create a configuration with a custom URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 10,
        }
    }

    /// Whether the connection uses TLS
    pub fn uses_tls(&self) -> bool {
        self.url.starts_with("rediss://")
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::with_url(DEFAULT_REDIS_URL)
    }
}
