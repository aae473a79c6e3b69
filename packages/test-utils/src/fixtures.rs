//! rstest fixtures for the provisioned test environment
//!
//! Bring them into scope with `use atlas_test_utils::fixtures::*;` and name
//! them as test arguments. Path and environment fixtures are session
//! scoped (computed once per test binary); mock fixtures are function
//! scoped and build a fresh client for every test.
//!
//! ```rust,ignore
//! use atlas_test_utils::fixtures::*;
//! use rstest::rstest;
//!
//! #[rstest]
//! #[tokio::test]
//! async fn caches_lookups(mock_cache_client: MockCacheClient) {
//!     // ...
//! }
//! ```

use std::path::Path;

use rstest::fixture;

pub use crate::{
    MockCacheClient, MockComputeClusterClient, MockInferenceClient, MockSearchClient,
    TestEnvironment,
};
use crate::{ensure_test_environment, paths};

/// The provisioned environment
#[fixture]
pub fn test_environment() -> &'static TestEnvironment {
    ensure_test_environment()
}

/// `data` directory next to the tests anchor; not checked for existence
#[fixture]
pub fn test_data_dir() -> &'static Path {
    ensure_test_environment();
    paths::test_data_dir()
}

/// `config` directory beside the tests anchor; not checked for existence
#[fixture]
pub fn config_dir() -> &'static Path {
    ensure_test_environment();
    paths::config_dir()
}

/// Fresh recording cache client
#[fixture]
pub fn mock_cache_client() -> MockCacheClient {
    ensure_test_environment();
    MockCacheClient::new()
}

/// Fresh recording search client
#[fixture]
pub fn mock_search_client() -> MockSearchClient {
    ensure_test_environment();
    MockSearchClient::new()
}

/// Fresh recording inference client reporting the session's `MODEL`
#[fixture]
pub fn mock_inference_client() -> MockInferenceClient {
    let env = ensure_test_environment();
    let client = MockInferenceClient::new();
    match env.applied().value(atlas_shared_config::defaults::MODEL) {
        Some(model) => client.with_model(model),
        None => client,
    }
}

/// Fresh recording compute cluster client
#[fixture]
pub fn mock_compute_cluster_client() -> MockComputeClusterClient {
    ensure_test_environment();
    MockComputeClusterClient::new()
}
