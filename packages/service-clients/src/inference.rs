//! Model inference client interface

use async_trait::async_trait;

use crate::{ChatMessage, ClientResult};

/// Model inference service (Ollama semantics)
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Single-prompt completion
    async fn generate(&self, prompt: &str) -> ClientResult<String>;

    /// Chat completion; returns the assistant's reply
    async fn chat(&self, messages: Vec<ChatMessage>) -> ClientResult<String>;

    /// Embedding vector for `text`
    async fn embed(&self, text: &str) -> ClientResult<Vec<f32>>;

    /// Names of the models available on the server
    async fn list_models(&self) -> ClientResult<Vec<String>>;
}
