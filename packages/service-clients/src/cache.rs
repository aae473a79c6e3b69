//! Key-value cache client interface

use async_trait::async_trait;

use crate::ClientResult;

/// Key-value cache (Redis semantics)
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// GET; `None` when the key is missing or expired
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;

    /// SET without expiration
    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;

    /// SETEX; a zero TTL means no expiration
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> ClientResult<()>;

    /// DEL; `true` if the key existed
    async fn delete(&self, key: &str) -> ClientResult<bool>;

    /// EXISTS
    async fn exists(&self, key: &str) -> ClientResult<bool>;
}
