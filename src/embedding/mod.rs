//! Embedding provider adapters.
//!
//! Model names resolve through an explicit provider table; there is no
//! substring sniffing of model names. Resolution failures are configuration
//! errors raised before any network I/O.

pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::types::PipelineError;

pub use http::HttpEmbedder;
pub use mock::MockEmbedder;

/// A supported embedding endpoint family, carrying its URL and the
/// environment variable holding its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    TogetherAi,
}

impl ProviderKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/embeddings",
            ProviderKind::TogetherAi => "https://api.together.xyz/v1/embeddings",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::TogetherAi => "TOGETHER_API_KEY",
        }
    }
}

/// Descriptor for one embedding model: provider routing, input limit, and
/// the dimension its vectors must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingModel {
    pub name: String,
    pub provider: ProviderKind,
    pub max_context: usize,
    pub dimension: usize,
}

impl EmbeddingModel {
    /// Looks up a model name in the provider table.
    ///
    /// Unknown names are a [`PipelineError::Configuration`]; no network call
    /// has happened at this point.
    pub fn resolve(name: &str) -> Result<Self, PipelineError> {
        let (provider, max_context, dimension) = match name {
            "text-embedding-3-small" => (ProviderKind::OpenAi, 8191, 1536),
            "text-embedding-3-large" => (ProviderKind::OpenAi, 8191, 3072),
            "text-embedding-ada-002" => (ProviderKind::OpenAi, 8191, 1536),
            "togethercomputer/m2-bert-80M-8k-retrieval" => (ProviderKind::TogetherAi, 8192, 768),
            _ => {
                return Err(PipelineError::Configuration(format!(
                    "unrecognized embedding model '{name}'"
                )));
            }
        };
        Ok(Self {
            name: name.to_string(),
            provider,
            max_context,
            dimension,
        })
    }
}

/// Maps chunk text to an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The model this embedder submits to.
    fn model(&self) -> &EmbeddingModel;

    /// Embeds one chunk of text.
    ///
    /// Implementations must return a vector of exactly
    /// `self.model().dimension` values or a [`PipelineError::Provider`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}
