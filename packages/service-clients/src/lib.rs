//! Client interfaces for the external services Atlas depends on
//!
//! Each service gets one object-safe async trait. Production code holds
//! them as `Arc<dyn ...>` so tests can substitute the recording doubles from
//! `atlas-test-utils`.
//!
//! # Services
//!
//! - [`CacheClient`] - key-value cache (Redis)
//! - [`SearchClient`] - document search index (Elasticsearch)
//! - [`InferenceClient`] - model inference (Ollama)
//! - [`ComputeClusterClient`] - distributed compute (Spark)

mod cache;
mod compute;
mod error;
mod inference;
mod models;
mod search;

pub use cache::CacheClient;
pub use compute::ComputeClusterClient;
pub use error::{ClientError, ClientResult};
pub use inference::InferenceClient;
pub use models::{ChatMessage, ChatRole, JobId, JobSpec, JobStatus, SearchHit, SearchResponse};
pub use search::SearchClient;
