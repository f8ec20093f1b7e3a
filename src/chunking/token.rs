//! Deterministic token-window chunker over a named BPE tokenizer.

use tiktoken_rs::CoreBPE;

use crate::types::PipelineError;

/// Supported tiktoken encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    #[default]
    Cl100kBase,
    P50kBase,
    R50kBase,
}

impl TokenizerKind {
    /// Name recorded on every chunk row.
    pub fn name(&self) -> &'static str {
        match self {
            TokenizerKind::Cl100kBase => "cl100k_base",
            TokenizerKind::P50kBase => "p50k_base",
            TokenizerKind::R50kBase => "r50k_base",
        }
    }

    fn load(&self) -> Result<CoreBPE, PipelineError> {
        let loaded = match self {
            TokenizerKind::Cl100kBase => tiktoken_rs::cl100k_base(),
            TokenizerKind::P50kBase => tiktoken_rs::p50k_base(),
            TokenizerKind::R50kBase => tiktoken_rs::r50k_base(),
        };
        loaded.map_err(|err| {
            PipelineError::Configuration(format!("failed to load tokenizer {}: {err}", self.name()))
        })
    }
}

/// One ordered span of a document, bounded by the embedding model's input
/// limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSlice {
    pub body: String,
    /// UTF-8 byte length of `body`.
    pub byte_size: usize,
    pub token_count: usize,
}

/// Splits normalized text into contiguous, non-overlapping token windows.
pub struct TokenChunker {
    encoding: CoreBPE,
    kind: TokenizerKind,
}

impl TokenChunker {
    pub fn new(kind: TokenizerKind) -> Result<Self, PipelineError> {
        Ok(Self {
            encoding: kind.load()?,
            kind,
        })
    }

    /// Name of the encoding backing this chunker.
    pub fn tokenizer_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Number of tokens the encoding produces for `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }

    /// Splits `content` into ordered slices of at most `max_context` tokens.
    ///
    /// Content that fits within `max_context` is returned as a single slice
    /// holding the original text; this includes empty content, which yields
    /// one empty slice. Longer content is partitioned into windows of exactly
    /// `max_context` tokens (the final window may be shorter), each decoded
    /// back to text. Windows never overlap and never reorder content.
    pub fn chunk(
        &self,
        content: &str,
        max_context: usize,
    ) -> Result<Vec<ChunkSlice>, PipelineError> {
        if max_context == 0 {
            return Err(PipelineError::Configuration(
                "max_context must be positive".to_string(),
            ));
        }

        let tokens = self.encoding.encode_ordinary(content);
        if tokens.len() <= max_context {
            return Ok(vec![ChunkSlice {
                body: content.to_string(),
                byte_size: content.len(),
                token_count: tokens.len(),
            }]);
        }

        let mut slices = Vec::with_capacity(tokens.len().div_ceil(max_context));
        for window in tokens.chunks(max_context) {
            let body = self.encoding.decode(window.to_vec()).map_err(|err| {
                PipelineError::Parse(format!("failed to decode token window: {err}"))
            })?;
            slices.push(ChunkSlice {
                byte_size: body.len(),
                token_count: window.len(),
                body,
            });
        }
        Ok(slices)
    }
}
