//! Recursive character splitter used at ingestion.
//!
//! The text is split on the first separator that occurs in it. Pieces shorter
//! than `chunk_size` are merged greedily, carrying up to `chunk_overlap`
//! characters of the previous chunk into the next. Pieces that are still too
//! long are split again with the remaining separators. Each separator stays
//! attached to the start of the piece that follows it. All lengths are in
//! characters.

use std::collections::VecDeque;

use crate::core::config::ChunkingConfig;

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keep_start(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        length = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if !current.is_empty() {
                    push_joined(&mut docs, &current);
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        match current.pop_front() {
                            Some((_, popped)) => total -= popped,
                            None => break,
                        }
                    }
                }
            }
            current.push_back((piece, len));
            total += len;
        }

        push_joined(&mut docs, &current);
        docs
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_joined(docs: &mut Vec<String>, current: &VecDeque<(&str, usize)>) {
    let joined: String = current.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Splits on every occurrence of `separator`, keeping it at the start of the
/// following piece. An empty separator splits into single characters.
fn split_keep_start<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        pieces.push(&text[start..index]);
        start = index;
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveTextSplitter {
        RecursiveTextSplitter::new(&ChunkingConfig {
            chunk_size,
            chunk_overlap,
            ..ChunkingConfig::default()
        })
    }

    #[test]
    fn split_keep_start_attaches_separator_to_next_piece() {
        assert_eq!(split_keep_start("a.b.c", "."), vec!["a", ".b", ".c"]);
        assert_eq!(split_keep_start(".a", "."), vec![".a"]);
        assert_eq!(split_keep_start("hé", ""), vec!["h", "é"]);
    }

    #[test]
    fn unbroken_text_splits_into_overlapping_windows() {
        let text: String = (0..1200).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = splitter(500, 100).split_text(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], text[0..500]);
        assert_eq!(chunks[1], text[400..900]);
        assert_eq!(chunks[2], text[800..1200]);
        for pair in chunks.windows(2) {
            let tail = &pair[0][pair[0].len() - 100..];
            assert!(pair[1].starts_with(tail));
        }
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunks = splitter(500, 100).split_text("  Refunds take 30 days.  ");
        assert_eq!(chunks, vec!["Refunds take 30 days."]);
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let para = "word ".repeat(60);
        let text = format!("{}\n\n{}\n\n{}", para.trim(), para.trim(), para.trim());
        let chunks = splitter(500, 100).split_text(&text);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        assert!(chunks.iter().all(|c| !c.starts_with('\n')));
    }

    #[test]
    fn long_sentences_fall_back_to_finer_separators() {
        let sentence = "lorem ipsum dolor sit amet ".repeat(30);
        let chunks = splitter(200, 40).split_text(&sentence);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
        assert!(chunks.iter().all(|c| c == c.trim()));
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        let text = "é".repeat(1200);
        let chunks = splitter(500, 100).split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
    }

    #[test]
    fn empty_and_whitespace_text_yield_no_chunks() {
        assert!(splitter(500, 100).split_text("").is_empty());
        assert!(splitter(500, 100).split_text(" \n\n \n").is_empty());
    }
}
