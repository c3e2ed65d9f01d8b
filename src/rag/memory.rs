//! In-process document store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{embed_inputs, rank_by_similarity, Chunk, ChunkInput, DocumentStore};
use crate::core::errors::StorageError;
use crate::llm::Embedder;

pub struct InMemoryDocumentStore {
    embedder: Arc<dyn Embedder>,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryDocumentStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add(&self, chunks: Vec<ChunkInput>) -> Result<usize, StorageError> {
        let embedded = embed_inputs(&self.embedder, chunks).await?;
        let added = embedded.len();
        self.chunks.write().await.extend(embedded);
        Ok(added)
    }

    async fn all(&self) -> Result<Vec<Chunk>, StorageError> {
        Ok(self.chunks.read().await.clone())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, StorageError> {
        let chunks = self.chunks.read().await;
        Ok(rank_by_similarity(chunks.iter().cloned(), query_embedding, k))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.chunks.read().await.len())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.chunks.write().await.clear();
        Ok(())
    }
}
