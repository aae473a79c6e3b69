//! Shared configuration types for Atlas services
//!
//! This crate owns the names and defaults of the environment variables the
//! platform reads, and turns them into typed configuration. Both the
//! services and the test provisioner depend on it so they agree on what an
//! unset variable means.

pub mod defaults;
mod elasticsearch;
mod error;
mod log_level;
mod ollama;
mod provider;
mod redis;

pub use elasticsearch::ElasticsearchConfig;
pub use error::{ConfigError, ConfigResult};
pub use log_level::LogLevel;
pub use ollama::OllamaConfig;
pub use provider::{EnvProvider, MapEnv, SystemEnv};
pub use redis::RedisConfig;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_LOG_LEVEL, LOG_LEVEL};

/// Configuration for every external service the platform talks to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Model inference (Ollama)
    pub ollama: OllamaConfig,

    /// Key-value cache (Redis)
    pub redis: RedisConfig,

    /// Search index (Elasticsearch)
    pub elasticsearch: ElasticsearchConfig,

    /// Log level (from LOG_LEVEL)
    pub log_level: LogLevel,
}

impl ServiceConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_provider(&SystemEnv)
    }

    /// Load configuration from any environment provider
    pub fn from_provider(env: &impl EnvProvider) -> ConfigResult<Self> {
        Ok(Self {
            ollama: OllamaConfig::from_provider(env)?,
            redis: RedisConfig::from_provider(env)?,
            elasticsearch: ElasticsearchConfig::from_provider(env)?,
            log_level: env_or_default(env, LOG_LEVEL, DEFAULT_LOG_LEVEL).parse()?,
        })
    }
}

/// Helper function to get a required environment variable
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    SystemEnv
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env_or_default(&SystemEnv, name, default)
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_env_from(&SystemEnv, name, default)
}

pub(crate) fn env_or_default(env: &impl EnvProvider, name: &str, default: &str) -> String {
    env.get(name).unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_env_from<T>(env: &impl EnvProvider, name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(name) {
        Some(val) => val
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

pub(crate) fn validate_url(name: &str, value: &str) -> ConfigResult<url::Url> {
    url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}
