//! ```text
//! Download row ──► normalize::wp_payload ──► (text, stats, timestamps)
//!                                 │
//!                                 ├─► language detection (best effort)
//!                                 └─► chunking::TokenChunker ──► ordered slices
//!
//! Ordered slices ──► embedding::Embedder (per slice)
//!                 └─► pipeline::ChunkLinker ──► store::DocumentStore
//!                                 │
//!                                 └─► document upsert + metadata rows
//!
//! Linked chunk chain ──► downstream retrieval & reconstruction
//! ```
//!
//! The [`pipeline::Pipeline`] coordinator drives the whole flow for a set of
//! source identifiers over a bounded worker pool, containing failures per
//! source.

pub mod chunking;
pub mod embedding;
pub mod language;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod types;

pub use chunking::{ChunkSlice, TokenChunker, TokenizerKind};
pub use embedding::{Embedder, EmbeddingModel, HttpEmbedder, MockEmbedder, ProviderKind};
pub use language::{LanguageDetector, StopwordDetector};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary, SourceOutcome};
pub use store::{DocumentStore, MemoryStore, RawDocumentSource, SqliteStore};
pub use types::{PipelineError, StoreError};
