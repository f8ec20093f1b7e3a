//! HTTP embedding client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Embedder, EmbeddingModel, ProviderKind};
use crate::types::PipelineError;

/// Upper bound on one embedding request; surfaced as a provider failure for
/// the document being processed.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<&'static str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding client for the resolved provider of one model.
#[derive(Debug)]
pub struct HttpEmbedder {
    model: EmbeddingModel,
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpEmbedder {
    /// Builds a client for `model_name` with an explicit API key.
    pub fn new(model_name: &str, api_key: impl Into<String>) -> Result<Self, PipelineError> {
        let model = EmbeddingModel::resolve(model_name)?;
        let endpoint = Url::parse(model.provider.endpoint()).map_err(|err| {
            PipelineError::Configuration(format!("invalid provider endpoint: {err}"))
        })?;
        let client = build_client(DEFAULT_TIMEOUT)?;
        Ok(Self {
            model,
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// Builds a client for `model_name`, reading the provider's API key from
    /// the environment (a `.env` file is honored when present).
    pub fn from_env(model_name: &str) -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let model = EmbeddingModel::resolve(model_name)?;
        let var = model.provider.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| PipelineError::Configuration(format!("{var} is not set")))?;
        Self::new(model_name, api_key)
    }

    /// Overrides the provider endpoint; intended for tests and proxies.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Replaces the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, PipelineError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

fn build_client(timeout: Duration) -> Result<Client, PipelineError> {
    Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()
        .map_err(|err| PipelineError::Configuration(format!("failed to build HTTP client: {err}")))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let cleaned = text.replace('\n', " ");
        let request = EmbeddingRequest {
            input: cleaned.trim(),
            model: &self.model.name,
            encoding_format: matches!(self.model.provider, ProviderKind::OpenAi)
                .then_some("float"),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Provider(format!(
                "embedding request for model {} failed with status {status}",
                self.model.name
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let Some(first) = parsed.data.into_iter().next() else {
            return Err(PipelineError::Provider(format!(
                "embedding response for model {} carried no data",
                self.model.name
            )));
        };
        if first.embedding.len() != self.model.dimension {
            return Err(PipelineError::Provider(format!(
                "model {} returned {} values, expected dimension {}",
                self.model.name,
                first.embedding.len(),
                self.model.dimension
            )));
        }
        Ok(first.embedding)
    }
}
