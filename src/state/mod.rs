use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, StoreBackend};
use crate::graph::{build_qa_graph, ConversationWorkflow};
use crate::history::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use crate::llm::{build_embedder, Embedder, Generator, OpenAiProvider};
use crate::rag::{
    DocumentStore, InMemoryDocumentStore, Ingestor, RecursiveTextSplitter, RetrieverHandle,
    SqliteDocumentStore,
};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Owns the retriever handle, the ingestion service, the conversation
/// workflow and the session store. There is no process-global retriever; every
/// consumer reaches it through this state.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<AppConfig>,
    pub retriever: Arc<RetrieverHandle>,
    pub ingestor: Arc<Ingestor>,
    pub workflow: Arc<ConversationWorkflow>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Initializes the application state with the OpenAI-compatible client as
    /// generator and the configured embedder.
    pub async fn initialize(paths: Arc<AppPaths>, settings: AppConfig) -> Result<Arc<Self>, InitializationError> {
        let embedder = build_embedder(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        let generator: Arc<dyn Generator> =
            Arc::new(OpenAiProvider::new(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?);

        Self::with_collaborators(paths, settings, embedder, generator).await
    }

    /// Wires stores, retriever, ingestion and workflow around the given
    /// embedding and generation collaborators.
    pub async fn with_collaborators(
        paths: Arc<AppPaths>,
        settings: AppConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Arc<Self>, InitializationError> {
        let documents: Arc<dyn DocumentStore> = match settings.storage.backend {
            StoreBackend::Sqlite => Arc::new(
                SqliteDocumentStore::new(paths.as_ref(), embedder.clone())
                    .await
                    .map_err(|e| InitializationError::Documents(e.into()))?,
            ),
            StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new(embedder.clone())),
        };

        let sessions: Arc<dyn SessionStore> = match settings.sessions.backend {
            StoreBackend::Sqlite => Arc::new(
                SqliteSessionStore::new(paths.sessions_db_path.clone())
                    .await
                    .map_err(|e| InitializationError::Sessions(e.into()))?,
            ),
            StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
        };

        let retriever = Arc::new(RetrieverHandle::new(
            documents,
            embedder.clone(),
            settings.retrieval.clone(),
        ));

        let ingestor = Arc::new(Ingestor::new(
            retriever.clone(),
            RecursiveTextSplitter::new(&settings.chunking),
            paths.upload_dir.clone(),
        ));

        let graph = build_qa_graph(settings.graph.max_steps).map_err(|e| InitializationError::Graph(e.into()))?;

        let workflow = Arc::new(ConversationWorkflow::new(
            graph,
            retriever.clone(),
            generator.clone(),
            sessions.clone(),
            settings.retrieval.top_k,
        ));

        tracing::info!(
            documents = ?settings.storage.backend,
            sessions = ?settings.sessions.backend,
            embedder = embedder.name(),
            generator = generator.name(),
            "Application state initialized"
        );

        Ok(Arc::new(AppState {
            paths,
            settings: Arc::new(settings),
            retriever,
            ingestor,
            workflow,
            sessions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EmbeddingProvider;
    use crate::llm::HashingEmbedder;

    #[tokio::test]
    async fn sqlite_backends_are_created_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data")));

        let mut settings = AppConfig::default();
        settings.llm.embedding_provider = EmbeddingProvider::Hashing;
        settings.sessions.backend = StoreBackend::Sqlite;

        let state = AppState::initialize(paths.clone(), settings).await.unwrap();
        assert!(paths.documents_db_path.exists());
        assert!(paths.sessions_db_path.exists());
        assert_eq!(state.retriever.store().count().await.unwrap(), 0);
        assert!(state.sessions.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_backends_need_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data")));

        let mut settings = AppConfig::default();
        settings.storage.backend = StoreBackend::Memory;

        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(16));
        let generator: Arc<dyn Generator> = Arc::new(OpenAiProvider::new(&settings.llm).unwrap());
        let state = AppState::with_collaborators(paths.clone(), settings, embedder, generator)
            .await
            .unwrap();

        assert!(!paths.documents_db_path.exists());
        assert_eq!(state.settings.retrieval.top_k, 3);
    }
}
