//! Recognised environment variables and their default values
//!
//! These are the values a test session falls back to when the invoking
//! environment leaves a variable unset. Service configuration loading uses
//! the same table so both sides agree on what "unset" means.

/// Inference server address
pub const OLLAMA_IP: &str = "OLLAMA_IP";

/// Model used for generation and chat
pub const MODEL: &str = "MODEL";

/// Cache connection URL
pub const REDIS_URL: &str = "REDIS_URL";

/// Search cluster URL
pub const ELASTICSEARCH_URL: &str = "ELASTICSEARCH_URL";

/// Log verbosity
pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const DEFAULT_OLLAMA_IP: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3:8b";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
pub const DEFAULT_LOG_LEVEL: &str = "DEBUG";

/// Every recognised variable paired with its default, in application order
pub const RECOGNIZED_DEFAULTS: [(&str, &str); 5] = [
    (OLLAMA_IP, DEFAULT_OLLAMA_IP),
    (MODEL, DEFAULT_MODEL),
    (REDIS_URL, DEFAULT_REDIS_URL),
    (ELASTICSEARCH_URL, DEFAULT_ELASTICSEARCH_URL),
    (LOG_LEVEL, DEFAULT_LOG_LEVEL),
];

/// Look up the default for a recognised variable
pub fn default_for(name: &str) -> Option<&'static str> {
    RECOGNIZED_DEFAULTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
}
