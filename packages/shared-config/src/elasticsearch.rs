//! Elasticsearch configuration types

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_ELASTICSEARCH_URL, ELASTICSEARCH_URL};
use crate::{env_or_default, validate_url, ConfigResult, EnvProvider};

/// Elasticsearch search cluster configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster base URL
    pub url: String,
}

impl ElasticsearchConfig {
    /// Load Elasticsearch configuration from an environment provider
    pub fn from_provider(env: &impl EnvProvider) -> ConfigResult<Self> {
        let url = env_or_default(env, ELASTICSEARCH_URL, DEFAULT_ELASTICSEARCH_URL);
        validate_url(ELASTICSEARCH_URL, &url)?;
        Ok(Self { url })
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// URL of an index's search endpoint
    pub fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.url.trim_end_matches('/'), index)
    }

    /// URL of a single document
    pub fn document_url(&self, index: &str, id: &str) -> String {
        format!("{}/{}/_doc/{}", self.url.trim_end_matches('/'), index, id)
    }
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self::with_url(DEFAULT_ELASTICSEARCH_URL)
    }
}
