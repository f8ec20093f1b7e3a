//! Two-phase chunk linking.
//!
//! Store ids are assigned at insert time, so a chunk can never know its
//! successor's id up front. The linker models this explicitly: each append
//! inserts the chunk with the left reference drawn from the current state,
//! then patches the predecessor's right reference now that the new id is
//! known, then advances the state. The final chunk's right reference stays
//! absent.

use crate::models::NewChunk;
use crate::store::DocumentStore;
use crate::types::StoreError;

/// Linking progress for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No chunk inserted yet; the next chunk heads the chain.
    NoPrevious,
    /// The id of the most recently inserted chunk, awaiting its right patch.
    HavePrevious(String),
}

/// Appends chunks to a document's chain in positional order.
pub struct ChunkLinker<'a> {
    store: &'a dyn DocumentStore,
    state: LinkState,
}

impl<'a> ChunkLinker<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            state: LinkState::NoPrevious,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Inserts `chunk` as the next link of the chain and returns its id.
    ///
    /// The caller's `left_chunk_id` is overwritten from the linker state; the
    /// predecessor's right reference is patched as a required side effect of
    /// the state transition.
    pub async fn append(&mut self, mut chunk: NewChunk) -> Result<String, StoreError> {
        chunk.left_chunk_id = match &self.state {
            LinkState::NoPrevious => None,
            LinkState::HavePrevious(id) => Some(id.clone()),
        };
        let id = self.store.insert_chunk(&chunk).await?;
        if let LinkState::HavePrevious(previous) = &self.state {
            self.store.update_chunk_right_ref(previous, &id).await?;
        }
        self.state = LinkState::HavePrevious(id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn chunk(document_id: &str, body: &str) -> NewChunk {
        NewChunk {
            document_id: document_id.to_string(),
            body: body.to_string(),
            byte_size: body.len() as i64,
            tokenizer: "cl100k_base".to_string(),
            token_count: 1,
            natural_lang: None,
            left_chunk_id: None,
        }
    }

    #[tokio::test]
    async fn appends_build_a_doubly_linked_chain() {
        let store = MemoryStore::new();
        let mut linker = ChunkLinker::new(&store);
        assert_eq!(linker.state(), &LinkState::NoPrevious);

        let a = linker.append(chunk("doc", "first")).await.unwrap();
        assert_eq!(linker.state(), &LinkState::HavePrevious(a.clone()));
        let b = linker.append(chunk("doc", "second")).await.unwrap();
        let c = linker.append(chunk("doc", "third")).await.unwrap();

        let chunks = store.chunks_for_document("doc").await.unwrap();
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].id, a);
        assert_eq!(chunks[0].left_chunk_id, None);
        assert_eq!(chunks[0].right_chunk_id.as_deref(), Some(b.as_str()));

        assert_eq!(chunks[1].left_chunk_id.as_deref(), Some(a.as_str()));
        assert_eq!(chunks[1].right_chunk_id.as_deref(), Some(c.as_str()));

        assert_eq!(chunks[2].left_chunk_id.as_deref(), Some(b.as_str()));
        assert_eq!(chunks[2].right_chunk_id, None);
    }

    #[tokio::test]
    async fn caller_supplied_left_reference_is_ignored() {
        let store = MemoryStore::new();
        let mut linker = ChunkLinker::new(&store);

        let mut head = chunk("doc", "head");
        head.left_chunk_id = Some("bogus".to_string());
        linker.append(head).await.unwrap();

        let chunks = store.chunks_for_document("doc").await.unwrap();
        assert_eq!(chunks[0].left_chunk_id, None);
    }
}
