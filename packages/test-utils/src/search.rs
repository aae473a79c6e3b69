//! Recording search client

use async_trait::async_trait;
use atlas_service_clients::{ClientResult, SearchClient, SearchHit, SearchResponse};
use serde_json::{json, Value};

use crate::recorder::{CallRecorder, StubBuilder};

/// Recording stand-in for [`SearchClient`]
///
/// Unstubbed searches return no hits, lookups return `None` and deletes
/// report that nothing was removed.
#[derive(Debug, Clone, Default)]
pub struct MockSearchClient {
    recorder: CallRecorder,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn when(&self, method: &str) -> StubBuilder<'_> {
        self.recorder.when(method)
    }

    /// Answer every search with `hits`
    pub fn stub_hits(&self, hits: Vec<SearchHit>) {
        let total = hits.len() as u64;
        self.recorder.when("search").returns(SearchResponse { total, hits });
    }

    /// Documents passed to `index_document`, as `(index, id, document)`
    pub fn indexed_documents(&self) -> Vec<(String, String, Value)> {
        self.recorder
            .calls_to("index_document")
            .into_iter()
            .filter_map(|call| match call.args.as_slice() {
                [Value::String(index), Value::String(id), document] => {
                    Some((index.clone(), id.clone(), document.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn index_document(&self, index: &str, id: &str, document: Value) -> ClientResult<()> {
        self.recorder
            .respond("index_document", vec![json!(index), json!(id), document])
    }

    async fn get_document(&self, index: &str, id: &str) -> ClientResult<Option<Value>> {
        self.recorder
            .respond("get_document", vec![json!(index), json!(id)])
    }

    async fn search(&self, index: &str, query: Value) -> ClientResult<SearchResponse> {
        self.recorder.respond("search", vec![json!(index), query])
    }

    async fn delete_document(&self, index: &str, id: &str) -> ClientResult<bool> {
        self.recorder
            .respond("delete_document", vec![json!(index), json!(id)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_defaults_to_empty() {
        let search = MockSearchClient::new();
        let response = search
            .search("documents", json!({"query": {"match_all": {}}}))
            .await
            .unwrap();
        assert!(response.is_empty());
        assert_eq!(response.total, 0);
    }

    #[tokio::test]
    async fn test_stub_hits() {
        let search = MockSearchClient::new();
        search.stub_hits(vec![SearchHit {
            id: "doc-1".into(),
            score: 1.5,
            source: json!({"title": "Quarterly report"}),
        }]);

        let response = search.search("documents", json!({})).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].id, "doc-1");
    }

    #[tokio::test]
    async fn test_indexed_documents() {
        let search = MockSearchClient::new();
        search
            .index_document("documents", "doc-7", json!({"body": "hello"}))
            .await
            .unwrap();

        assert_eq!(
            search.indexed_documents(),
            vec![("documents".to_string(), "doc-7".to_string(), json!({"body": "hello"}))]
        );
        assert_eq!(search.get_document("documents", "doc-7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_is_recorded_verbatim() {
        let search = MockSearchClient::new();
        let query = json!({"query": {"term": {"tag": "finance"}}});
        search.search("documents", query.clone()).await.unwrap();

        let call = search.recorder().last_call("search").unwrap();
        assert_eq!(call.arg(1), Some(&query));
    }
}
