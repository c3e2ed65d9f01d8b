//! Hybrid retriever: BM25 and vector similarity fused into one ranking.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::lexical::LexicalIndex;
use super::semantic::SemanticIndex;
use super::store::{Chunk, DocumentStore};
use crate::core::config::{FusionStrategy, RetrievalConfig};
use crate::core::errors::RetrievalError;
use crate::llm::Embedder;

pub struct HybridRetriever {
    lexical: LexicalIndex,
    semantic: SemanticIndex,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Snapshots the store and builds the lexical index off the async runtime.
    pub async fn build(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: RetrievalConfig,
    ) -> Result<Self, RetrievalError> {
        let chunks = store.all().await?;
        let lexical = tokio::task::spawn_blocking(move || LexicalIndex::build(chunks))
            .await
            .map_err(|e| RetrievalError::IndexBuild(e.to_string()))?;

        tracing::info!(chunks = lexical.len(), "Hybrid retriever built");

        Ok(Self {
            lexical,
            semantic: SemanticIndex::new(store, embedder),
            config,
        })
    }

    /// Number of chunks in the snapshot this retriever was built from.
    pub fn len(&self) -> usize {
        self.lexical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty()
    }

    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>, RetrievalError> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let dense = self.semantic.query(question, self.config.dense_k).await?;
        let lexical = self.lexical.query(question, self.config.lexical_k);

        tracing::debug!(
            dense = dense.len(),
            lexical = lexical.len(),
            k,
            "Fusing retrieval candidates"
        );

        Ok(fuse(dense, lexical, &self.config, k))
    }
}

struct Candidate {
    chunk: Chunk,
    dense_rank: Option<usize>,
    lexical_rank: Option<usize>,
    dense_score: f32,
    lexical_score: f32,
    first_seen: usize,
    combined: f64,
}

/// Scales scores by the list's best score so the weakest candidate keeps a
/// non-zero share. Non-positive scores map to 0; a list without a positive
/// score maps to 1.0 throughout and falls back to rank tie-breaking.
fn normalize(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max <= f32::EPSILON {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|s| s.max(0.0) / max).collect()
}

fn rank_order(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Merges the two ranked lists, deduplicates by chunk id and keeps the best `k`.
///
/// Ties on the combined score fall back to dense rank, then lexical rank,
/// then the order in which chunks were first seen (dense list first).
pub fn fuse(
    dense: Vec<(Chunk, f32)>,
    lexical: Vec<(Chunk, f32)>,
    config: &RetrievalConfig,
    k: usize,
) -> Vec<Chunk> {
    let dense_norm = normalize(&dense.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let lexical_norm = normalize(&lexical.iter().map(|(_, s)| *s).collect::<Vec<_>>());

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (rank, ((chunk, _), norm)) in dense.into_iter().zip(dense_norm).enumerate() {
        if by_id.contains_key(&chunk.id) {
            continue;
        }
        by_id.insert(chunk.id.clone(), candidates.len());
        candidates.push(Candidate {
            chunk,
            dense_rank: Some(rank),
            lexical_rank: None,
            dense_score: norm,
            lexical_score: 0.0,
            first_seen: candidates.len(),
            combined: 0.0,
        });
    }

    for (rank, ((chunk, _), norm)) in lexical.into_iter().zip(lexical_norm).enumerate() {
        match by_id.get(&chunk.id) {
            Some(&idx) => {
                let candidate = &mut candidates[idx];
                if candidate.lexical_rank.is_none() {
                    candidate.lexical_rank = Some(rank);
                    candidate.lexical_score = norm;
                }
            }
            None => {
                by_id.insert(chunk.id.clone(), candidates.len());
                candidates.push(Candidate {
                    chunk,
                    dense_rank: None,
                    lexical_rank: Some(rank),
                    dense_score: 0.0,
                    lexical_score: norm,
                    first_seen: candidates.len(),
                    combined: 0.0,
                });
            }
        }
    }

    for candidate in &mut candidates {
        candidate.combined = match config.fusion {
            FusionStrategy::WeightedScore => {
                let dense = candidate.dense_rank.map(|_| config.dense_weight * candidate.dense_score as f64);
                let lexical = candidate
                    .lexical_rank
                    .map(|_| config.lexical_weight * candidate.lexical_score as f64);
                dense.unwrap_or(0.0) + lexical.unwrap_or(0.0)
            }
            FusionStrategy::ReciprocalRank => {
                let rrf = |weight: f64, rank: Option<usize>| {
                    rank.map(|r| weight / (config.rrf_c + r as f64 + 1.0)).unwrap_or(0.0)
                };
                rrf(config.dense_weight, candidate.dense_rank) + rrf(config.lexical_weight, candidate.lexical_rank)
            }
        };
    }

    candidates.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(Ordering::Equal)
            .then_with(|| rank_order(a.dense_rank, b.dense_rank))
            .then_with(|| rank_order(a.lexical_rank, b.lexical_rank))
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    candidates.truncate(k);

    candidates.into_iter().map(|c| c.chunk).collect()
}
