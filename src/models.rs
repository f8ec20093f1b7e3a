//! Logical records exchanged between the pipeline and its storage backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw, previously fetched payload for one source, read back from the
/// download store. The pipeline never fetches from the network itself.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source_id: String,
    pub download_id: String,
    /// Verbatim response body as persisted by the fetch layer.
    pub body: String,
}

/// Field set written on every document upsert. The row is keyed by
/// `source_id`; re-processing the same source updates these fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub source_id: String,
    pub download_id: String,
    pub format: String,
    pub min_chunk_size: i64,
    pub max_chunk_size: i64,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

/// A document row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub source_id: String,
    pub download_id: String,
    pub format: String,
    pub min_chunk_size: i64,
    pub max_chunk_size: i64,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

/// Chunk insert payload. `left_chunk_id` is assigned by the linker; the
/// right reference is never known at creation time and is patched after the
/// successor exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub document_id: String,
    pub body: String,
    pub byte_size: i64,
    pub tokenizer: String,
    pub token_count: i64,
    pub natural_lang: Option<String>,
    pub left_chunk_id: Option<String>,
}

/// A chunk row as stored, including the patched right reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub body: String,
    pub byte_size: i64,
    pub tokenizer: String,
    pub token_count: i64,
    pub natural_lang: Option<String>,
    pub left_chunk_id: Option<String>,
    pub right_chunk_id: Option<String>,
}

/// Embedding insert payload. `dimension` is derived from the vector at
/// construction, so `dimension == vector.len()` holds for every row written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmbedding {
    pub object_id: String,
    pub object_type: String,
    pub model: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub embedded_at: DateTime<Utc>,
}

impl NewEmbedding {
    /// Builds the embedding row for a chunk.
    pub fn for_chunk(chunk_id: impl Into<String>, model: impl Into<String>, vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self {
            object_id: chunk_id.into(),
            object_type: "chunk".to_string(),
            model: model.into(),
            vector,
            dimension,
            embedded_at: Utc::now(),
        }
    }
}

/// An embedding row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub object_id: String,
    pub object_type: String,
    pub model: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub embedded_at: DateTime<Utc>,
}

/// A per-document key/value metadata row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub document_id: String,
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
