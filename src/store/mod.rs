//! Storage seams for documents, chunks, embeddings, and metadata.
//!
//! The pipeline talks to an abstract [`DocumentStore`] so the same
//! orchestration runs against any backend. Two implementations ship here:
//!
//! * [`sqlite::SqliteStore`] — sqlx-backed SQLite with embedded migrations.
//! * [`memory::MemoryStore`] — in-process store for tests and demos.
//!
//! Every insert returns the id the store assigned; the linker depends on
//! that to patch right references after each successor exists.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{
    ChunkRecord, DocumentRecord, EmbeddingRecord, MetadataRecord, NewChunk, NewDocument,
    NewEmbedding, RawDocument,
};
use crate::types::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Rows removed when a document's chunk set is cleared before reprocessing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub chunks: u64,
    pub embeddings: u64,
    pub metadata: u64,
}

/// Read access to previously fetched downloads.
#[async_trait]
pub trait RawDocumentSource: Send + Sync {
    /// Returns the latest persisted download for a source.
    async fn fetch_raw_document(&self, source_id: &str) -> Result<RawDocument, StoreError>;
}

/// Transactional record store for the ingestion pipeline.
///
/// Each operation is an independent unit of work; the pipeline never spans a
/// transaction across a whole document. Implementations must support
/// concurrent writers for disjoint `source_id` keys.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup of the document owning a source, if any.
    async fn find_document_by_source(
        &self,
        source_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError>;

    /// Inserts the document under `id`, or updates all mutable fields of the
    /// existing row keyed by `source_id`. Returns the id of the surviving
    /// row (the pre-existing id on update).
    async fn upsert_document(&self, id: &str, document: &NewDocument)
    -> Result<String, StoreError>;

    /// Inserts a chunk and returns its generated id. The right reference is
    /// always absent at insert time.
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<String, StoreError>;

    /// Patches a chunk's right reference once its successor exists. Patching
    /// an unknown chunk is an error.
    async fn update_chunk_right_ref(
        &self,
        chunk_id: &str,
        right_chunk_id: &str,
    ) -> Result<(), StoreError>;

    /// Inserts an embedding row and returns its generated id.
    async fn insert_embedding(&self, embedding: &NewEmbedding) -> Result<String, StoreError>;

    /// Appends one metadata row keyed `(document_id, key)` and returns its
    /// generated id.
    async fn insert_metadata(
        &self,
        document_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<String, StoreError>;

    /// Removes the document's chunks, their embeddings, and its metadata
    /// rows. The document row itself is untouched.
    async fn delete_document_data(&self, document_id: &str) -> Result<PurgeSummary, StoreError>;

    /// All chunks of a document in insertion order.
    async fn chunks_for_document(&self, document_id: &str)
    -> Result<Vec<ChunkRecord>, StoreError>;

    /// All metadata rows of a document in insertion order.
    async fn metadata_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<MetadataRecord>, StoreError>;

    /// Point lookup of the embedding stored for a chunk, if any.
    async fn embedding_for_chunk(
        &self,
        chunk_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError>;
}
