//! Error taxonomy shared across the ingestion pipeline.

use thiserror::Error;

/// Failures raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The embedding store only carries sparse columns for known dimensions.
    #[error("unsupported embedding dimension {0}")]
    UnsupportedDimension(usize),

    #[error("no download recorded for source {0}")]
    MissingDownload(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Fatal-to-document failures surfaced by the pipeline.
///
/// Every variant aborts processing of the current source only; the run
/// coordinator catches it at the per-source boundary and sibling sources are
/// unaffected. Language-detection failure is deliberately absent: the
/// detector seam is total and degrades to an unknown language.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Misconfiguration detected before any network or store I/O, e.g. an
    /// unrecognized embedding model name.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Embedding provider failure: non-success response, transport error,
    /// timeout, or a vector that does not match the declared dimension.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Malformed input: unparseable download body or timestamp.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Provider(err.to_string())
    }
}
