//! Explicit lifecycle for the shared hybrid retriever.
//!
//! The retriever is built lazily on first use and cached. Builds, rebuilds and
//! ingestion all take the same lifecycle lock, so at most one build runs at a
//! time and a completed ingestion is always visible to the next query.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::hybrid::HybridRetriever;
use super::store::{Chunk, ChunkInput, DocumentStore};
use crate::core::config::RetrievalConfig;
use crate::core::errors::{RetrievalError, StorageError};
use crate::llm::Embedder;

pub struct RetrieverHandle {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
    current: RwLock<Option<Arc<HybridRetriever>>>,
    lifecycle: Mutex<()>,
}

impl RetrieverHandle {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            config,
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    async fn build(&self) -> Result<Arc<HybridRetriever>, RetrievalError> {
        let retriever =
            HybridRetriever::build(self.store.clone(), self.embedder.clone(), self.config.clone()).await?;
        Ok(Arc::new(retriever))
    }

    /// Cached retriever, building it first if needed.
    pub async fn get(&self) -> Result<Arc<HybridRetriever>, RetrievalError> {
        if let Some(existing) = self.current.read().await.as_ref() {
            return Ok(existing.clone());
        }

        let _guard = self.lifecycle.lock().await;
        if let Some(existing) = self.current.read().await.as_ref() {
            return Ok(existing.clone());
        }

        let retriever = self.build().await?;
        *self.current.write().await = Some(retriever.clone());
        Ok(retriever)
    }

    pub async fn is_built(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Drops the cached retriever; the next `get` builds a fresh one.
    pub async fn invalidate(&self) {
        let _guard = self.lifecycle.lock().await;
        *self.current.write().await = None;
        tracing::info!("Retriever invalidated");
    }

    /// Builds from the current store contents and swaps the result in.
    pub async fn rebuild(&self) -> Result<Arc<HybridRetriever>, RetrievalError> {
        let _guard = self.lifecycle.lock().await;
        self.rebuild_locked().await
    }

    async fn rebuild_locked(&self) -> Result<Arc<HybridRetriever>, RetrievalError> {
        match self.build().await {
            Ok(retriever) => {
                *self.current.write().await = Some(retriever.clone());
                Ok(retriever)
            }
            Err(err) => {
                // The old snapshot no longer reflects the store.
                *self.current.write().await = None;
                Err(err)
            }
        }
    }

    /// Adds chunks to the store and rebuilds under the lifecycle lock.
    ///
    /// A failed rebuild after a successful write leaves the retriever
    /// unbuilt; the next `get` retries the build.
    pub async fn ingest(&self, chunks: Vec<ChunkInput>) -> Result<usize, StorageError> {
        let _guard = self.lifecycle.lock().await;
        let added = self.store.add(chunks).await?;

        if let Err(err) = self.rebuild_locked().await {
            tracing::warn!(error = %err, "Retriever rebuild after ingestion failed");
        }

        Ok(added)
    }

    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>, RetrievalError> {
        self.get().await?.retrieve(question, k).await
    }
}
