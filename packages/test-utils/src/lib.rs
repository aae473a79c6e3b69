//! Shared test fixtures and service mocks for the Atlas workspace
//!
//! This crate provisions a deterministic environment for test binaries and
//! provides recording implementations of the external service clients, so
//! suites run without Redis, Elasticsearch, Ollama or Spark.
//!
//! # Provisioning
//!
//! - [`ensure_test_environment`] - applies the `OLLAMA_IP`, `MODEL`,
//!   `REDIS_URL`, `ELASTICSEARCH_URL` and `LOG_LEVEL` defaults once per
//!   process, never overwriting values the caller already set
//! - [`paths`] - session-cached `data` and `config` directories
//! - [`markers`] - `unit`, `integration`, `e2e` and `slow` tags and
//!   `TEST_MARKERS` selection
//! - [`fixtures`] - rstest fixtures over all of the above
//!
//! # Mock Services
//!
//! - [`MockCacheClient`] - recording key-value cache
//! - [`MockSearchClient`] - recording search index
//! - [`MockInferenceClient`] - recording model inference
//! - [`MockComputeClusterClient`] - recording compute cluster
//!
//! # Example
//!
//! ```rust,ignore
//! use atlas_test_utils::fixtures::*;
//! use rstest::rstest;
//!
//! #[rstest]
//! #[tokio::test]
//! async fn test_with_mocks(mock_inference_client: MockInferenceClient) {
//!     mock_inference_client.when("generate").returns("42");
//!     // hand mock_inference_client.clone() to the code under test, then
//!     assert_eq!(mock_inference_client.recorder().call_count("generate"), 1);
//! }
//! ```

mod cache;
mod compute;
pub mod env;
pub mod fixtures;
mod inference;
mod logging;
pub mod markers;
pub mod paths;
mod recorder;
mod search;
mod session;
mod store;

pub use cache::MockCacheClient;
pub use compute::MockComputeClusterClient;
pub use env::{load_config_env, AppliedDefault, AppliedDefaults, DefaultOrigin, EnvDefaults, EnvFileError};
pub use inference::{fixed_embedding, MockInferenceClient};
pub use logging::init_test_tracing;
pub use markers::{register_markers, Marker, MarkerError, MarkerExpr, MarkerRegistry, MarkerSelection};
pub use paths::{session_paths, set_session_paths, TestPaths};
pub use recorder::{Call, CallRecorder, StubBuilder};
pub use search::MockSearchClient;
pub use session::{ensure_test_environment, run_session, EnvironmentSession, TestEnvironment, CONFIG_ENV_FILE};
pub use store::MemoryStore;
