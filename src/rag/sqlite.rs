//! SQLite-backed document store.
//!
//! Chunks live in one table with their embedding as a little-endian f32 blob.
//! Similarity search is a brute-force cosine scan in insertion order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{embed_inputs, rank_by_similarity, Chunk, ChunkInput, DocumentStore};
use crate::core::config::AppPaths;
use crate::core::errors::StorageError;
use crate::llm::Embedder;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteDocumentStore {
    pub async fn new(paths: &AppPaths, embedder: Arc<dyn Embedder>) -> Result<Self, StorageError> {
        Self::with_path(paths.documents_db_path.clone(), embedder).await
    }

    pub async fn with_path(db_path: PathBuf, embedder: Arc<dyn Embedder>) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StorageError::backend)?;

        let store = Self { pool, embedder };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                text TEXT,
                metadata TEXT DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Missing text reads as `""`, missing or malformed metadata as empty.
    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, StorageError> {
        let id: String = row.try_get("id").map_err(StorageError::backend)?;
        let text: Option<String> = row.try_get("text").map_err(StorageError::backend)?;
        let metadata: Option<String> = row.try_get("metadata").map_err(StorageError::backend)?;
        let embedding: Vec<u8> = row.try_get("embedding").map_err(StorageError::backend)?;

        let metadata = match metadata.map(|raw| serde_json::from_str::<HashMap<String, String>>(&raw)) {
            Some(Ok(metadata)) => metadata,
            Some(Err(err)) => {
                tracing::warn!(chunk_id = %id, error = %err, "Ignoring malformed chunk metadata");
                HashMap::new()
            }
            None => HashMap::new(),
        };

        Ok(Chunk {
            id,
            text: text.unwrap_or_default(),
            metadata,
            embedding: Self::deserialize_embedding(&embedding),
        })
    }

    async fn load_all(&self) -> Result<Vec<Chunk>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, text, metadata, embedding
             FROM documents
             ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        rows.iter().map(Self::row_to_chunk).collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(&self, chunks: Vec<ChunkInput>) -> Result<usize, StorageError> {
        let embedded = embed_inputs(&self.embedder, chunks).await?;
        if embedded.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(StorageError::backend)?;

        for chunk in &embedded {
            let blob = Self::serialize_embedding(&chunk.embedding);
            let metadata_str = serde_json::to_string(&chunk.metadata).map_err(StorageError::backend)?;

            sqlx::query(
                "INSERT INTO documents (id, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::backend)?;
        }

        tx.commit().await.map_err(StorageError::backend)?;
        Ok(embedded.len())
    }

    async fn all(&self) -> Result<Vec<Chunk>, StorageError> {
        self.load_all().await
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, StorageError> {
        let chunks = self.load_all().await?;
        Ok(rank_by_similarity(chunks, query_embedding, k))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::backend)?;

        Ok(count as usize)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await
            .map_err(StorageError::backend)?;

        Ok(())
    }
}
