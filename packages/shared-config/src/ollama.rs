//! Ollama inference configuration types

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_MODEL, DEFAULT_OLLAMA_IP, MODEL, OLLAMA_IP};
use crate::{env_or_default, parse_env_from, validate_url, ConfigResult, EnvProvider};

/// Ollama inference service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server URL
    pub url: String,

    /// Model for chat/generation (e.g., llama3:8b)
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Load Ollama configuration from an environment provider
    pub fn from_provider(env: &impl EnvProvider) -> ConfigResult<Self> {
        let url = env_or_default(env, OLLAMA_IP, DEFAULT_OLLAMA_IP);
        validate_url(OLLAMA_IP, &url)?;

        Ok(Self {
            url,
            model: env_or_default(env, MODEL, DEFAULT_MODEL),
            timeout_secs: parse_env_from(env, "OLLAMA_TIMEOUT", 60)?,
        })
    }

    /// Create a configuration with a custom URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Get the full URL for the generation endpoint
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.url.trim_end_matches('/'))
    }

    /// Get the full URL for the embeddings endpoint
    pub fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.url.trim_end_matches('/'))
    }

    /// Get the full URL for the chat endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.url.trim_end_matches('/'))
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_IP.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}
