//! Search index client interface

use async_trait::async_trait;
use serde_json::Value;

use crate::{ClientResult, SearchResponse};

/// Document search index (Elasticsearch semantics)
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Index or replace a document under `id`
    async fn index_document(&self, index: &str, id: &str, document: Value) -> ClientResult<()>;

    /// Fetch a document's source
    async fn get_document(&self, index: &str, id: &str) -> ClientResult<Option<Value>>;

    /// Run a query DSL body against an index
    async fn search(&self, index: &str, query: Value) -> ClientResult<SearchResponse>;

    /// Delete a document; `true` if it existed
    async fn delete_document(&self, index: &str, id: &str) -> ClientResult<bool>;
}
