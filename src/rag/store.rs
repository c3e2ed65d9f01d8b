//! Document store abstraction shared by the in-memory and SQLite backends.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::StorageError;
use crate::llm::Embedder;

/// A chunk before embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkInput {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ChunkInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A stored, embedded chunk. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Embeds and appends `chunks`. Either every chunk is written or none is.
    async fn add(&self, chunks: Vec<ChunkInput>) -> Result<usize, StorageError>;

    /// Every stored chunk in insertion order.
    async fn all(&self) -> Result<Vec<Chunk>, StorageError>;

    /// Top `k` chunks by cosine similarity, ties in insertion order.
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;

    /// Drop every stored chunk.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Embeds all inputs in one batch and assigns fresh ids.
///
/// Fails without producing anything if the embedder errors, returns the
/// wrong number of vectors, or returns an empty vector.
pub(crate) async fn embed_inputs(
    embedder: &Arc<dyn Embedder>,
    inputs: Vec<ChunkInput>,
) -> Result<Vec<Chunk>, StorageError> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = inputs.iter().map(|input| input.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .map_err(|e| StorageError::Embedding(e.to_string()))?;

    if vectors.len() != inputs.len() {
        return Err(StorageError::EmbeddingCount {
            expected: inputs.len(),
            actual: vectors.len(),
        });
    }
    if let Some(position) = vectors.iter().position(|v| v.is_empty()) {
        return Err(StorageError::Embedding(format!(
            "embedder returned an empty vector for input {}",
            position
        )));
    }

    Ok(inputs
        .into_iter()
        .zip(vectors)
        .map(|(input, embedding)| Chunk {
            id: uuid::Uuid::new_v4().to_string(),
            text: input.text,
            metadata: input.metadata,
            embedding,
        })
        .collect())
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Scores chunks (given in insertion order) against the query and keeps the
/// best `k`. The sort is stable so equal scores stay in insertion order.
pub(crate) fn rank_by_similarity(
    chunks: impl IntoIterator<Item = Chunk>,
    query_embedding: &[f32],
    k: usize,
) -> Vec<(Chunk, f32)> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(Chunk, f32)> = chunks
        .into_iter()
        .map(|chunk| {
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            (chunk, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use crate::core::errors::ApiError;
    use crate::llm::Embedder;

    /// Embedder that always fails, for all-or-nothing checks.
    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Upstream("embedding service down".to_string()))
        }
    }

    /// Embedder that drops the last vector of every batch.
    pub struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Embedder with fixed vectors keyed by exact text; unknown text maps to
    /// the zero vector of the same size.
    pub struct TableEmbedder(pub Vec<(&'static str, Vec<f32>)>);

    #[async_trait]
    impl Embedder for TableEmbedder {
        fn name(&self) -> &str {
            "table"
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            let dims = self.0.first().map(|(_, v)| v.len()).unwrap_or(1);
            Ok(inputs
                .iter()
                .map(|text| {
                    self.0
                        .iter()
                        .find(|(key, _)| *key == text.as_str())
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| vec![0.0; dims])
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::llm::HashingEmbedder;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: id.to_string(),
            metadata: HashMap::new(),
            embedding,
        }
    }

    #[test]
    fn cosine_handles_mismatched_and_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ranking_keeps_insertion_order_on_ties() {
        let ranked = rank_by_similarity(
            vec![
                chunk("a", vec![1.0, 0.0]),
                chunk("b", vec![0.0, 1.0]),
                chunk("c", vec![1.0, 0.0]),
            ],
            &[1.0, 0.0],
            2,
        );
        let ids: Vec<&str> = ranked.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn embed_inputs_assigns_unique_ids() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(8));
        let chunks = embed_inputs(
            &embedder,
            vec![ChunkInput::new("one"), ChunkInput::new("two").with_metadata("source", "a.pdf")],
        )
        .await
        .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_ne!(chunks[0].id, chunks[1].id);
        assert_eq!(chunks[1].metadata.get("source").map(String::as_str), Some("a.pdf"));
    }

    #[tokio::test]
    async fn embed_inputs_rejects_count_mismatch() {
        let embedder: Arc<dyn Embedder> = Arc::new(ShortEmbedder);
        let err = embed_inputs(&embedder, vec![ChunkInput::new("a"), ChunkInput::new("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmbeddingCount { expected: 2, actual: 1 }));
    }

    #[tokio::test]
    async fn embed_inputs_surfaces_embedder_failure() {
        let embedder: Arc<dyn Embedder> = Arc::new(FailingEmbedder);
        let err = embed_inputs(&embedder, vec![ChunkInput::new("a")]).await.unwrap_err();
        assert!(matches!(err, StorageError::Embedding(_)));
    }
}
