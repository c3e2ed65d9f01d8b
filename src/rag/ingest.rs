//! Document ingestion: extract, split, embed, store, rebuild.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::chunking::RecursiveTextSplitter;
use super::extract::{extractor_for, TextExtractor};
use super::handle::RetrieverHandle;
use super::store::ChunkInput;
use crate::core::errors::{ExtractError, IngestError, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestAck {
    pub status: String,
    pub message: String,
    pub chunks: usize,
}

impl IngestAck {
    fn success(message: String, chunks: usize) -> Self {
        Self {
            status: "success".to_string(),
            message,
            chunks,
        }
    }
}

pub struct Ingestor {
    handle: Arc<RetrieverHandle>,
    splitter: RecursiveTextSplitter,
    upload_dir: PathBuf,
}

impl Ingestor {
    pub fn new(handle: Arc<RetrieverHandle>, splitter: RecursiveTextSplitter, upload_dir: PathBuf) -> Self {
        Self {
            handle,
            splitter,
            upload_dir,
        }
    }

    /// Stores already-split chunks. Nothing is written if embedding fails.
    pub async fn ingest(&self, sources: Vec<ChunkInput>) -> Result<IngestAck, StorageError> {
        let added = self.handle.ingest(sources).await?;
        tracing::info!(chunks = added, "Ingested chunks");
        Ok(IngestAck::success(format!("{} chunks ingested successfully.", added), added))
    }

    /// Saves an uploaded file, extracts and splits its text, then ingests it.
    ///
    /// The saved file is removed again when the document cannot be ingested.
    pub async fn ingest_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestAck, IngestError> {
        let file_name = sanitize_file_name(file_name)?;
        let extractor = extractor_for(&file_name)?;

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let saved_path = self.upload_dir.join(&file_name);
        tokio::fs::write(&saved_path, &bytes).await?;
        tracing::debug!(path = %saved_path.display(), bytes = bytes.len(), "Saved upload");

        match self.ingest_saved(&file_name, extractor, bytes).await {
            Ok(ack) => Ok(ack),
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&saved_path).await {
                    tracing::warn!(
                        path = %saved_path.display(),
                        error = %remove_err,
                        "Failed to remove rejected upload"
                    );
                }
                Err(err)
            }
        }
    }

    async fn ingest_saved(
        &self,
        file_name: &str,
        extractor: Arc<dyn TextExtractor>,
        bytes: Vec<u8>,
    ) -> Result<IngestAck, IngestError> {
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(e.to_string()))??;

        let pieces = self.splitter.split_text(&text);
        if pieces.is_empty() {
            return Err(IngestError::EmptyDocument(file_name.to_string()));
        }

        let inputs: Vec<ChunkInput> = pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                ChunkInput::new(text)
                    .with_metadata("source", file_name)
                    .with_metadata("chunk_index", index.to_string())
            })
            .collect();

        let added = self.handle.ingest(inputs).await?;
        tracing::info!(file = %file_name, chunks = added, "Document ingested");

        Ok(IngestAck::success(format!("{} ingested successfully.", file_name), added))
    }
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize_file_name(file_name: &str) -> Result<String, ExtractError> {
    Path::new(file_name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .ok_or_else(|| ExtractError::Unsupported(format!("invalid file name '{}'", file_name)))
}
