//! Deterministic in-process embedder for tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Embedder, EmbeddingModel, ProviderKind};
use crate::types::PipelineError;

/// Hash-derived embedder: identical text always maps to the same vector, no
/// network involved. A failure can be injected on a specific call index to
/// exercise the pipeline's containment behavior.
pub struct MockEmbedder {
    model: EmbeddingModel,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl MockEmbedder {
    pub fn new(dimension: usize, max_context: usize) -> Self {
        Self {
            model: EmbeddingModel {
                name: "mock-embedder".to_string(),
                provider: ProviderKind::OpenAi,
                max_context,
                dimension,
            },
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    /// Fails the zero-based `call`-th embed call with a provider error.
    #[must_use]
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of embed calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            return Err(PipelineError::Provider(format!(
                "mock provider failure injected on call {call}"
            )));
        }
        Ok(hash_to_vec(text, self.model.dimension))
    }
}

fn hash_to_vec(text: &str, dimension: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimension)
        .map(|i| {
            let bits = seed.rotate_left((i % 64) as u32) ^ ((i as u64) << 24);
            ((bits & u64::from(u32::MAX)) as f32) / u32::MAX as f32
        })
        .collect()
}
