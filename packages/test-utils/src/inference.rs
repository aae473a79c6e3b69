//! Recording inference client

use async_trait::async_trait;
use atlas_service_clients::{ChatMessage, ClientResult, InferenceClient};
use serde_json::json;

use crate::recorder::{CallRecorder, StubBuilder};

/// Recording stand-in for [`InferenceClient`]
///
/// Unstubbed completions return an empty string. Embeddings are empty
/// unless a dimension is configured, in which case a deterministic vector
/// of that length is returned. `list_models` reports the configured model,
/// if any.
#[derive(Debug, Clone, Default)]
pub struct MockInferenceClient {
    recorder: CallRecorder,
    model: Option<String>,
    embedding_dimension: Option<usize>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `model` from unstubbed `list_models` calls
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Return `dimension`-length embeddings from unstubbed `embed` calls
    #[must_use]
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = Some(dimension);
        self
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    pub fn when(&self, method: &str) -> StubBuilder<'_> {
        self.recorder.when(method)
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

/// Deterministic embedding of the given length
pub fn fixed_embedding(dimension: usize) -> Vec<f32> {
    (0..dimension).map(|i| (i as f32 * 0.001) % 1.0).collect()
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn generate(&self, prompt: &str) -> ClientResult<String> {
        self.recorder.respond("generate", vec![json!(prompt)])
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> ClientResult<String> {
        self.recorder.respond("chat", vec![json!(messages)])
    }

    async fn embed(&self, text: &str) -> ClientResult<Vec<f32>> {
        self.recorder.respond_or_else("embed", vec![json!(text)], || {
            Ok(self.embedding_dimension.map(fixed_embedding).unwrap_or_default())
        })
    }

    async fn list_models(&self) -> ClientResult<Vec<String>> {
        self.recorder
            .respond_or_else("list_models", vec![], || Ok(self.model.iter().cloned().collect()))
    }
}
