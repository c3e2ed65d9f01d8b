//! Vector-similarity side of hybrid retrieval.

use std::sync::Arc;

use super::store::{Chunk, DocumentStore};
use crate::core::errors::RetrievalError;
use crate::llm::Embedder;

#[derive(Clone)]
pub struct SemanticIndex {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticIndex {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embeds `text` and asks the store for the `k` nearest chunks.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<(Chunk, f32)>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let query_embedding = vectors
            .pop()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RetrievalError::Embedding("embedder returned no query vector".to_string()))?;

        Ok(self.store.similarity_search(&query_embedding, k).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::memory::InMemoryDocumentStore;
    use crate::rag::store::test_support::{FailingEmbedder, TableEmbedder};
    use crate::rag::store::ChunkInput;

    #[tokio::test]
    async fn returns_nearest_chunks_up_to_store_size() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder(vec![
            ("cats", vec![1.0, 0.0]),
            ("dogs", vec![0.0, 1.0]),
            ("kittens", vec![0.9, 0.1]),
        ]));
        let store = Arc::new(InMemoryDocumentStore::new(embedder.clone()));
        store
            .add(vec![ChunkInput::new("cats"), ChunkInput::new("dogs")])
            .await
            .unwrap();

        let index = SemanticIndex::new(store, embedder);
        let results = index.query("kittens", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "cats");
    }

    #[tokio::test]
    async fn query_embedding_failure_is_a_retrieval_error() {
        let store = Arc::new(InMemoryDocumentStore::new(Arc::new(FailingEmbedder)));
        let index = SemanticIndex::new(store, Arc::new(FailingEmbedder));
        let err = index.query("anything", 3).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }
}
