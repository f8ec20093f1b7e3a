//! In-process store used by tests and demos.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DocumentStore, PurgeSummary, RawDocumentSource};
use crate::models::{
    ChunkRecord, DocumentRecord, EmbeddingRecord, MetadataRecord, NewChunk, NewDocument,
    NewEmbedding, RawDocument,
};
use crate::types::StoreError;

#[derive(Debug, Default)]
struct Inner {
    documents: Vec<DocumentRecord>,
    chunks: Vec<ChunkRecord>,
    embeddings: Vec<EmbeddingRecord>,
    metadata: Vec<MetadataRecord>,
    downloads: Vec<RawDocument>,
}

/// Vec-backed store with the same contract as the SQLite backend: generated
/// ids on insert, upsert keyed by `source_id`, insertion order preserved.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a download so the store can serve as a [`RawDocumentSource`].
    pub async fn seed_download(
        &self,
        source_id: impl Into<String>,
        body: impl Into<String>,
    ) -> String {
        let download_id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.downloads.push(RawDocument {
            source_id: source_id.into(),
            download_id: download_id.clone(),
            body: body.into(),
        });
        download_id
    }

    /// Snapshot of all document rows.
    pub async fn documents(&self) -> Vec<DocumentRecord> {
        self.inner.lock().await.documents.clone()
    }

    /// Snapshot of all chunk rows across documents.
    pub async fn all_chunks(&self) -> Vec<ChunkRecord> {
        self.inner.lock().await.chunks.clone()
    }
}

#[async_trait]
impl RawDocumentSource for MemoryStore {
    async fn fetch_raw_document(&self, source_id: &str) -> Result<RawDocument, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .downloads
            .iter()
            .rev()
            .find(|download| download.source_id == source_id)
            .cloned()
            .ok_or_else(|| StoreError::MissingDownload(source_id.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_document_by_source(
        &self,
        source_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .documents
            .iter()
            .find(|doc| doc.source_id == source_id)
            .cloned())
    }

    async fn upsert_document(
        &self,
        id: &str,
        document: &NewDocument,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner
            .documents
            .iter_mut()
            .find(|doc| doc.source_id == document.source_id)
        {
            existing.download_id = document.download_id.clone();
            existing.format = document.format.clone();
            existing.min_chunk_size = document.min_chunk_size;
            existing.max_chunk_size = document.max_chunk_size;
            existing.published_at = document.published_at;
            existing.modified_at = document.modified_at;
            existing.indexed_at = document.indexed_at;
            return Ok(existing.id.clone());
        }
        inner.documents.push(DocumentRecord {
            id: id.to_string(),
            source_id: document.source_id.clone(),
            download_id: document.download_id.clone(),
            format: document.format.clone(),
            min_chunk_size: document.min_chunk_size,
            max_chunk_size: document.max_chunk_size,
            published_at: document.published_at,
            modified_at: document.modified_at,
            indexed_at: document.indexed_at,
        });
        Ok(id.to_string())
    }

    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.chunks.push(ChunkRecord {
            id: id.clone(),
            document_id: chunk.document_id.clone(),
            body: chunk.body.clone(),
            byte_size: chunk.byte_size,
            tokenizer: chunk.tokenizer.clone(),
            token_count: chunk.token_count,
            natural_lang: chunk.natural_lang.clone(),
            left_chunk_id: chunk.left_chunk_id.clone(),
            right_chunk_id: None,
        });
        Ok(id)
    }

    async fn update_chunk_right_ref(
        &self,
        chunk_id: &str,
        right_chunk_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let chunk = inner
            .chunks
            .iter_mut()
            .find(|chunk| chunk.id == chunk_id)
            .ok_or_else(|| StoreError::Backend(format!("chunk {chunk_id} not found")))?;
        chunk.right_chunk_id = Some(right_chunk_id.to_string());
        Ok(())
    }

    async fn insert_embedding(&self, embedding: &NewEmbedding) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.embeddings.push(EmbeddingRecord {
            id: id.clone(),
            object_id: embedding.object_id.clone(),
            object_type: embedding.object_type.clone(),
            model: embedding.model.clone(),
            vector: embedding.vector.clone(),
            dimension: embedding.dimension,
            embedded_at: embedding.embedded_at,
        });
        Ok(id)
    }

    async fn insert_metadata(
        &self,
        document_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.metadata.push(MetadataRecord {
            id: id.clone(),
            document_id: document_id.to_string(),
            key: key.to_string(),
            value: value.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn delete_document_data(&self, document_id: &str) -> Result<PurgeSummary, StoreError> {
        let mut inner = self.inner.lock().await;
        let chunk_ids: Vec<String> = inner
            .chunks
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .map(|chunk| chunk.id.clone())
            .collect();

        let before = inner.embeddings.len();
        inner
            .embeddings
            .retain(|embedding| !chunk_ids.contains(&embedding.object_id));
        let embeddings = (before - inner.embeddings.len()) as u64;

        let before = inner.chunks.len();
        inner.chunks.retain(|chunk| chunk.document_id != document_id);
        let chunks = (before - inner.chunks.len()) as u64;

        let before = inner.metadata.len();
        inner.metadata.retain(|meta| meta.document_id != document_id);
        let metadata = (before - inner.metadata.len()) as u64;

        Ok(PurgeSummary {
            chunks,
            embeddings,
            metadata,
        })
    }

    async fn chunks_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<ChunkRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .chunks
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn metadata_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<MetadataRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .metadata
            .iter()
            .filter(|meta| meta.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn embedding_for_chunk(
        &self,
        chunk_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .embeddings
            .iter()
            .find(|embedding| embedding.object_id == chunk_id)
            .cloned())
    }
}
