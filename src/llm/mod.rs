pub mod hashing;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiProvider;
pub use provider::{Embedder, Generator};
pub use types::{ChatMessage, ChatRequest};

use crate::core::config::{EmbeddingProvider, LlmConfig};
use crate::core::errors::ApiError;

/// Selects the embedder named by `llm.embedding_provider`.
pub fn build_embedder(config: &LlmConfig) -> Result<Arc<dyn Embedder>, ApiError> {
    match config.embedding_provider {
        EmbeddingProvider::Openai => Ok(Arc::new(OpenAiProvider::new(config)?)),
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(config.hashing_dimensions))),
    }
}
