//! Token-bounded document splitting.

pub mod token;

pub use token::{ChunkSlice, TokenChunker, TokenizerKind};
