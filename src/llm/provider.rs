use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Turns texts into embedding vectors, one vector per input in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// provider name used in logs (e.g. "openai", "hashing")
    fn name(&self) -> &str;

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Language model used to answer the built prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// Single-turn instruction: the prompt is sent as one user message.
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let request = ChatRequest::new(vec![super::types::ChatMessage::user(prompt)]);
        self.chat(request).await
    }
}
