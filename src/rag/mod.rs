//! Retrieval-augmented generation pipeline.
//!
//! - `chunking` / `extract` / `ingest`: turning uploads into stored chunks
//! - `store` / `memory` / `sqlite`: document store backends
//! - `lexical` / `semantic` / `hybrid`: the two retrieval signals and their fusion
//! - `handle`: lazily built, explicitly rebuilt retriever shared by requests
//! - `prompt`: grounded answer prompt

pub mod chunking;
pub mod extract;
pub mod handle;
pub mod hybrid;
pub mod ingest;
pub mod lexical;
pub mod memory;
pub mod prompt;
pub mod semantic;
pub mod sqlite;
pub mod store;

pub use chunking::RecursiveTextSplitter;
pub use handle::RetrieverHandle;
pub use hybrid::HybridRetriever;
pub use ingest::{IngestAck, Ingestor};
pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use store::{Chunk, ChunkInput, DocumentStore};
