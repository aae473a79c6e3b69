//! Recording cache client

use async_trait::async_trait;
use atlas_service_clients::{CacheClient, ClientResult};
use serde_json::json;

use crate::recorder::{CallRecorder, StubBuilder};
use crate::store::MemoryStore;

/// Recording stand-in for [`CacheClient`]
///
/// Unstubbed calls return defaults (`None`, `false`, `()`), or are served
/// by an in-memory store when built with [`with_memory_store`](Self::with_memory_store).
///
/// # Example
///
/// ```rust
/// use atlas_service_clients::CacheClient;
/// use atlas_test_utils::MockCacheClient;
///
/// # tokio_test::block_on(async {
/// let cache = MockCacheClient::new();
/// cache.when("get").returns(Some("cached"));
///
/// assert_eq!(cache.get("user:1").await.unwrap(), Some("cached".to_string()));
/// assert_eq!(cache.recorder().call_count("get"), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCacheClient {
    recorder: CallRecorder,
    store: Option<MemoryStore>,
}

impl MockCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve unstubbed calls from an in-memory store
    pub fn with_memory_store() -> Self {
        Self {
            recorder: CallRecorder::new(),
            store: Some(MemoryStore::new()),
        }
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn when(&self, method: &str) -> StubBuilder<'_> {
        self.recorder.when(method)
    }

    pub fn store(&self) -> Option<&MemoryStore> {
        self.store.as_ref()
    }
}

#[async_trait]
impl CacheClient for MockCacheClient {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        self.recorder.respond_or_else("get", vec![json!(key)], || {
            Ok(self.store.as_ref().and_then(|store| store.get(key)))
        })
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.recorder.respond_or_else("set", vec![json!(key), json!(value)], || {
            if let Some(store) = &self.store {
                store.set(key, value);
            }
            Ok(())
        })
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> ClientResult<()> {
        self.recorder.respond_or_else(
            "set_ex",
            vec![json!(key), json!(value), json!(ttl_secs)],
            || {
                if let Some(store) = &self.store {
                    store.setex(key, ttl_secs, value);
                }
                Ok(())
            },
        )
    }

    async fn delete(&self, key: &str) -> ClientResult<bool> {
        self.recorder.respond_or_else("delete", vec![json!(key)], || {
            Ok(self.store.as_ref().is_some_and(|store| store.del(key)))
        })
    }

    async fn exists(&self, key: &str) -> ClientResult<bool> {
        self.recorder.respond_or_else("exists", vec![json!(key)], || {
            Ok(self.store.as_ref().is_some_and(|store| store.exists(key)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_service_clients::ClientError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unstubbed_calls_return_defaults() {
        let cache = MockCacheClient::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
        assert!(!cache.exists("missing").await.unwrap());
        cache.set("k", "v").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.recorder().total_calls(), 4);
    }

    #[tokio::test]
    async fn test_records_arguments() {
        let cache = MockCacheClient::new();
        cache.set_ex("session:42", "alice", 900).await.unwrap();

        let call = cache.recorder().last_call("set_ex").unwrap();
        assert_eq!(call.args, vec![json!("session:42"), json!("alice"), json!(900)]);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let cache = MockCacheClient::with_memory_store();
        cache.set_ex("track:1", "{\"title\":\"Intro\"}", 60).await.unwrap();

        assert!(cache.exists("track:1").await.unwrap());
        assert_eq!(
            cache.get("track:1").await.unwrap().as_deref(),
            Some("{\"title\":\"Intro\"}")
        );
        assert!(cache.delete("track:1").await.unwrap());
        assert!(!cache.exists("track:1").await.unwrap());
        assert!(cache.store().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stub_overrides_memory_store() {
        let cache = MockCacheClient::with_memory_store();
        cache.set("k", "stored").await.unwrap();
        cache.when("get").returns_once(Some("stubbed"));

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("stubbed"));
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("stored"));
    }

    #[tokio::test]
    async fn test_failure_propagates_through_trait_object() {
        let mock = MockCacheClient::new();
        mock.when("get").fails(ClientError::Connection {
            service: "redis".into(),
            reason: "connection refused".into(),
        });
        let cache: Arc<dyn CacheClient> = Arc::new(mock.clone());

        let err = cache.get("k").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(mock.recorder().call_count("get"), 1);
    }
}
