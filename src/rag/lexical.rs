//! BM25 keyword index over a snapshot of the document store.
//!
//! Built once from `DocumentStore::all()` and never updated in place; the
//! retriever handle rebuilds it after ingestion.

use std::collections::HashMap;

use super::store::Chunk;

const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Lowercase alphanumeric runs. Everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

#[derive(Debug, Default)]
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    doc_freqs: HashMap<String, usize>,
    avg_doc_len: f32,
}

impl LexicalIndex {
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let total: usize = doc_lens.iter().sum();
        let avg_doc_len = if chunks.is_empty() {
            0.0
        } else {
            total as f32 / chunks.len() as f32
        };

        Self {
            chunks,
            term_freqs,
            doc_lens,
            doc_freqs,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.chunks.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score(&self, doc: usize, query_terms: &[String]) -> f32 {
        let freqs = &self.term_freqs[doc];
        let len_norm = if self.avg_doc_len > 0.0 {
            self.doc_lens[doc] as f32 / self.avg_doc_len
        } else {
            0.0
        };

        query_terms
            .iter()
            .filter_map(|term| freqs.get(term).map(|tf| (term, *tf as f32)))
            .map(|(term, tf)| self.idf(term) * tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * len_norm)))
            .sum()
    }

    /// Top `k` chunks with a positive score, ties in chunk order.
    pub fn query(&self, text: &str, k: usize) -> Vec<(Chunk, f32)> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let query_terms = tokenize(text);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .map(|doc| (doc, self.score(doc, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(doc, score)| (self.chunks[doc].clone(), score))
            .collect()
    }
}
