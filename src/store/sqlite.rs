//! SQLite persistence over sqlx.
//!
//! Embedded migrations run on open. Ids are uuids assigned at insert time and
//! returned to the caller, which is what the two-phase chunk linking depends
//! on. Embedding vectors land in per-dimension sparse columns
//! (`embedding_768` / `embedding_1536` / `embedding_3072`); models with any
//! other dimension are rejected by the store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{DocumentStore, PurgeSummary, RawDocumentSource};
use crate::models::{
    ChunkRecord, DocumentRecord, EmbeddingRecord, MetadataRecord, NewChunk, NewDocument,
    NewEmbedding, RawDocument,
};
use crate::types::StoreError;

/// SQLite-backed implementation of the pipeline's storage seams.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) a database file and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Connects to an existing database URL and applies migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool, for queries outside the store contract.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Registers a source and returns its id.
    pub async fn insert_source(&self, raw_url: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let host = url::Url::parse(raw_url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string));
        sqlx::query("INSERT INTO sources (id, raw_url, host, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&id)
            .bind(raw_url)
            .bind(host)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    /// Records a fetched body for a source and returns the download id.
    pub async fn insert_download(&self, source_id: &str, body: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO downloads (id, source_id, body, downloaded_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind(source_id)
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// All registered source ids in registration order.
    pub async fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT id FROM sources ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(StoreError::from))
            .collect()
    }
}

fn embedding_column(dimension: usize) -> Result<&'static str, StoreError> {
    match dimension {
        768 => Ok("embedding_768"),
        1536 => Ok("embedding_1536"),
        3072 => Ok("embedding_3072"),
        other => Err(StoreError::UnsupportedDimension(other)),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<DocumentRecord, StoreError> {
    Ok(DocumentRecord {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        download_id: row.try_get("download_id")?,
        format: row.try_get("format")?,
        min_chunk_size: row.try_get("min_chunk_size")?,
        max_chunk_size: row.try_get("max_chunk_size")?,
        published_at: row.try_get("published_at")?,
        modified_at: row.try_get("modified_at")?,
        indexed_at: row.try_get("indexed_at")?,
    })
}

fn chunk_from_row(row: &SqliteRow) -> Result<ChunkRecord, StoreError> {
    Ok(ChunkRecord {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        body: row.try_get("body")?,
        byte_size: row.try_get("byte_size")?,
        tokenizer: row.try_get("tokenizer")?,
        token_count: row.try_get("token_count")?,
        natural_lang: row.try_get("natural_lang")?,
        left_chunk_id: row.try_get("left_chunk_id")?,
        right_chunk_id: row.try_get("right_chunk_id")?,
    })
}

#[async_trait]
impl RawDocumentSource for SqliteStore {
    async fn fetch_raw_document(&self, source_id: &str) -> Result<RawDocument, StoreError> {
        let row = sqlx::query(
            "SELECT id, source_id, body FROM downloads \
             WHERE source_id = ?1 AND body IS NOT NULL \
             ORDER BY rowid DESC LIMIT 1",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::MissingDownload(source_id.to_string()))?;

        Ok(RawDocument {
            download_id: row.try_get("id")?,
            source_id: row.try_get("source_id")?,
            body: row.try_get("body")?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_document_by_source(
        &self,
        source_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, source_id, download_id, format, min_chunk_size, max_chunk_size, \
             published_at, modified_at, indexed_at FROM documents WHERE source_id = ?1",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn upsert_document(
        &self,
        id: &str,
        document: &NewDocument,
    ) -> Result<String, StoreError> {
        let row = sqlx::query(
            "INSERT INTO documents (id, source_id, download_id, format, min_chunk_size, \
             max_chunk_size, published_at, modified_at, indexed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(source_id) DO UPDATE SET \
                 download_id = excluded.download_id, \
                 format = excluded.format, \
                 min_chunk_size = excluded.min_chunk_size, \
                 max_chunk_size = excluded.max_chunk_size, \
                 published_at = excluded.published_at, \
                 modified_at = excluded.modified_at, \
                 indexed_at = excluded.indexed_at \
             RETURNING id",
        )
        .bind(id)
        .bind(&document.source_id)
        .bind(&document.download_id)
        .bind(&document.format)
        .bind(document.min_chunk_size)
        .bind(document.max_chunk_size)
        .bind(document.published_at)
        .bind(document.modified_at)
        .bind(document.indexed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO chunks (id, document_id, body, byte_size, tokenizer, token_count, \
             natural_lang, left_chunk_id, right_chunk_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
        )
        .bind(&id)
        .bind(&chunk.document_id)
        .bind(&chunk.body)
        .bind(chunk.byte_size)
        .bind(&chunk.tokenizer)
        .bind(chunk.token_count)
        .bind(&chunk.natural_lang)
        .bind(&chunk.left_chunk_id)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_chunk_right_ref(
        &self,
        chunk_id: &str,
        right_chunk_id: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE chunks SET right_chunk_id = ?1 WHERE id = ?2")
            .bind(right_chunk_id)
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!("chunk {chunk_id} not found")));
        }
        Ok(())
    }

    async fn insert_embedding(&self, embedding: &NewEmbedding) -> Result<String, StoreError> {
        let column = embedding_column(embedding.dimension)?;
        let id = Uuid::new_v4().to_string();
        let vector_json = serde_json::to_string(&embedding.vector)?;
        let statement = format!(
            "INSERT INTO embeddings (id, object_id, object_type, model, dimension, {column}, \
             embedded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
        sqlx::query(&statement)
            .bind(&id)
            .bind(&embedding.object_id)
            .bind(&embedding.object_type)
            .bind(&embedding.model)
            .bind(embedding.dimension as i64)
            .bind(vector_json)
            .bind(embedding.embedded_at)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_metadata(
        &self,
        document_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO document_meta (id, document_id, key, meta, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(document_id)
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn delete_document_data(&self, document_id: &str) -> Result<PurgeSummary, StoreError> {
        let embeddings = sqlx::query(
            "DELETE FROM embeddings WHERE object_type = 'chunk' AND object_id IN \
             (SELECT id FROM chunks WHERE document_id = ?1)",
        )
        .bind(document_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let chunks = sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let metadata = sqlx::query("DELETE FROM document_meta WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

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
        let rows = sqlx::query(
            "SELECT id, document_id, body, byte_size, tokenizer, token_count, natural_lang, \
             left_chunk_id, right_chunk_id FROM chunks WHERE document_id = ?1 ORDER BY rowid",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn metadata_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<MetadataRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, document_id, key, meta, created_at FROM document_meta \
             WHERE document_id = ?1 ORDER BY rowid",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("meta")?;
                Ok(MetadataRecord {
                    id: row.try_get("id")?,
                    document_id: row.try_get("document_id")?,
                    key: row.try_get("key")?,
                    value: serde_json::from_str(&raw)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn embedding_for_chunk(
        &self,
        chunk_id: &str,
    ) -> Result<Option<EmbeddingRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, object_id, object_type, model, dimension, embedding_768, \
             embedding_1536, embedding_3072, embedded_at FROM embeddings \
             WHERE object_id = ?1 AND object_type = 'chunk' ORDER BY rowid DESC LIMIT 1",
        )
        .bind(chunk_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let dimension: i64 = row.try_get("dimension")?;
        let dimension = usize::try_from(dimension)
            .map_err(|_| StoreError::Backend(format!("negative dimension {dimension}")))?;
        let column = embedding_column(dimension)?;
        let raw: Option<String> = row.try_get(column)?;
        let raw = raw.ok_or_else(|| {
            StoreError::Backend(format!("embedding vector missing in column {column}"))
        })?;
        let vector: Vec<f32> = serde_json::from_str(&raw)?;
        let embedded_at: DateTime<Utc> = row.try_get("embedded_at")?;

        Ok(Some(EmbeddingRecord {
            id: row.try_get("id")?,
            object_id: row.try_get("object_id")?,
            object_type: row.try_get("object_type")?,
            model: row.try_get("model")?,
            vector,
            dimension,
            embedded_at,
        }))
    }
}
