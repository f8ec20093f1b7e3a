//! The document upsert coordinator.
//!
//! [`Pipeline`] owns every collaborator explicitly (store, download reader,
//! embedder, language detector, chunker) and drives the per-source flow:
//! normalize, chunk, clear the previous generation, embed and link-insert each
//! chunk, upsert the document row, insert metadata. Failures are contained at
//! the per-source boundary; a run over many sources proceeds regardless of
//! individual failures and reports timing for each.

pub mod linker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{StreamExt, stream};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::chunking::{TokenChunker, TokenizerKind};
use crate::embedding::Embedder;
use crate::language::{LanguageDetector, StopwordDetector};
use crate::models::{NewChunk, NewDocument, NewEmbedding};
use crate::normalize;
use crate::store::{DocumentStore, PurgeSummary, RawDocumentSource};
use crate::types::PipelineError;

pub use linker::{ChunkLinker, LinkState};

/// Declared lower chunk bound recorded on every document row. Informational:
/// the chunker only enforces the upper bound.
const DEFAULT_MIN_CHUNK_SIZE: i64 = 212;

/// Normalized output format recorded on documents.
const DOCUMENT_FORMAT: &str = "md";

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of sources processed at once.
    pub concurrency: usize,
    /// Value recorded as the document's `min_chunk_size`.
    pub min_chunk_size: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

/// What one successful source run produced.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source_id: String,
    pub document_id: String,
    pub chunk_count: usize,
    /// Rows cleared from the previous generation before inserting.
    pub purged: PurgeSummary,
}

/// Per-source result with timing, successful or not.
#[derive(Debug)]
pub struct SourceReport {
    pub source_id: String,
    pub elapsed: Duration,
    pub result: Result<SourceOutcome, PipelineError>,
}

/// Aggregate of one run over a set of sources.
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.processed()
    }
}

/// Coordinator for the normalize → chunk → embed → link → upsert flow.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    downloads: Arc<dyn RawDocumentSource>,
    embedder: Arc<dyn Embedder>,
    detector: Arc<dyn LanguageDetector>,
    chunker: TokenChunker,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full flow for one source.
    ///
    /// Everything committed before a failure stays committed: each store
    /// operation is an independent unit of work and there is no rollback.
    pub async fn process_source(&self, source_id: &str) -> Result<SourceOutcome, PipelineError> {
        let raw = self.downloads.fetch_raw_document(source_id).await?;
        let normalized = normalize::wp_payload(&raw.body)?;

        let natural_lang = self.detector.detect(&normalized.content);
        if natural_lang.is_none() {
            debug!(source_id, "language detection gave no verdict");
        }

        let model = self.embedder.model();
        let slices = self.chunker.chunk(&normalized.content, model.max_context)?;

        // The document row is written last, but chunks reference its id now:
        // reuse the existing document's id on reprocessing, otherwise
        // pre-assign one.
        let document_id = match self.store.find_document_by_source(source_id).await? {
            Some(existing) => existing.id,
            None => Uuid::new_v4().to_string(),
        };

        let purged = self.store.delete_document_data(&document_id).await?;
        if purged != PurgeSummary::default() {
            debug!(
                source_id,
                chunks = purged.chunks,
                embeddings = purged.embeddings,
                metadata = purged.metadata,
                "cleared previous document generation"
            );
        }

        let mut linker = ChunkLinker::new(self.store.as_ref());
        for slice in &slices {
            let vector = self.embedder.embed(&slice.body).await?;
            let chunk_id = linker
                .append(NewChunk {
                    document_id: document_id.clone(),
                    body: slice.body.clone(),
                    byte_size: slice.byte_size as i64,
                    tokenizer: self.chunker.tokenizer_name().to_string(),
                    token_count: slice.token_count as i64,
                    natural_lang: natural_lang.clone(),
                    left_chunk_id: None,
                })
                .await?;
            self.store
                .insert_embedding(&NewEmbedding::for_chunk(&chunk_id, &model.name, vector))
                .await?;
        }

        let document_id = self
            .store
            .upsert_document(
                &document_id,
                &NewDocument {
                    source_id: source_id.to_string(),
                    download_id: raw.download_id,
                    format: DOCUMENT_FORMAT.to_string(),
                    min_chunk_size: self.config.min_chunk_size,
                    max_chunk_size: model.max_context as i64,
                    published_at: normalized.published_at,
                    modified_at: normalized.modified_at,
                    indexed_at: Utc::now(),
                },
            )
            .await?;

        for (key, value) in normalized.metadata_entries() {
            self.store
                .insert_metadata(&document_id, key, &value)
                .await?;
        }

        Ok(SourceOutcome {
            source_id: source_id.to_string(),
            document_id,
            chunk_count: slices.len(),
            purged,
        })
    }

    /// Processes every source over a bounded worker pool and reports timing.
    ///
    /// A failing source never aborts its siblings; the summary carries one
    /// report per input source and the total elapsed time.
    pub async fn run(&self, source_ids: Vec<String>) -> RunSummary {
        let started = Instant::now();
        let concurrency = self.config.concurrency.max(1);

        let reports: Vec<SourceReport> = stream::iter(source_ids.into_iter().map(|source_id| {
            async move {
                let source_started = Instant::now();
                let result = self.process_source(&source_id).await;
                let elapsed = source_started.elapsed();
                match &result {
                    Ok(outcome) => info!(
                        source_id,
                        document_id = %outcome.document_id,
                        chunks = outcome.chunk_count,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "processed source"
                    ),
                    Err(err) => error!(
                        source_id,
                        error = %err,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "source pipeline failed"
                    ),
                }
                SourceReport {
                    source_id,
                    elapsed,
                    result,
                }
            }
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

        let summary = RunSummary {
            reports,
            elapsed: started.elapsed(),
        };
        info!(
            processed = summary.processed(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run complete"
        );
        summary
    }
}

/// Assembles a [`Pipeline`] from its collaborators.
#[derive(Default)]
pub struct PipelineBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    downloads: Option<Arc<dyn RawDocumentSource>>,
    embedder: Option<Arc<dyn Embedder>>,
    detector: Option<Arc<dyn LanguageDetector>>,
    tokenizer: TokenizerKind,
    config: PipelineConfig,
}

impl PipelineBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn downloads(mut self, downloads: Arc<dyn RawDocumentSource>) -> Self {
        self.downloads = Some(downloads);
        self
    }

    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Overrides the default [`StopwordDetector`].
    #[must_use]
    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    #[must_use]
    pub fn tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let store = self
            .store
            .ok_or_else(|| PipelineError::Configuration("pipeline requires a store".to_string()))?;
        let downloads = self.downloads.ok_or_else(|| {
            PipelineError::Configuration("pipeline requires a raw document source".to_string())
        })?;
        let embedder = self.embedder.ok_or_else(|| {
            PipelineError::Configuration("pipeline requires an embedder".to_string())
        })?;
        let detector = self
            .detector
            .unwrap_or_else(|| Arc::new(StopwordDetector::new()));
        let chunker = TokenChunker::new(self.tokenizer)?;

        Ok(Pipeline {
            store,
            downloads,
            embedder,
            detector,
            chunker,
            config: self.config,
        })
    }
}
