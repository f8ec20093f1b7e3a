//! End-to-end pipeline tests over the in-process store and mock embedder.
//!
//! These cover the ordering, linking, idempotency, and containment contracts
//! without touching the network or a database file.

use std::sync::Arc;

use docloom::chunking::{TokenChunker, TokenizerKind};
use docloom::embedding::MockEmbedder;
use docloom::models::ChunkRecord;
use docloom::pipeline::Pipeline;
use docloom::store::{DocumentStore, MemoryStore, RawDocumentSource};
use docloom::types::PipelineError;

fn wp_body(content_html: &str, modified_gmt: &str) -> String {
    serde_json::json!({
        "title": {"rendered": "Chunking <em>Guide</em>"},
        "excerpt": {"rendered": "<p>All about chunking.</p>"},
        "content": {"rendered": content_html},
        "link": "https://example.com/guide",
        "date_gmt": "2024-03-01T09:30:00",
        "modified_gmt": modified_gmt
    })
    .to_string()
}

fn long_content_html() -> String {
    let paragraphs: Vec<String> = (0..12)
        .map(|i| format!("<p>Paragraph {i} talks about ingestion topic number {i} in detail.</p>"))
        .collect();
    paragraphs.join("")
}

fn build_pipeline(store: &Arc<MemoryStore>, embedder: MockEmbedder) -> Arc<Pipeline> {
    let as_store: Arc<dyn DocumentStore> = store.clone();
    let as_downloads: Arc<dyn RawDocumentSource> = store.clone();
    Arc::new(
        Pipeline::builder()
            .store(as_store)
            .downloads(as_downloads)
            .embedder(Arc::new(embedder))
            .build()
            .unwrap(),
    )
}

/// Orders chunks by following right references from the single head.
fn traverse(chunks: &[ChunkRecord]) -> Vec<ChunkRecord> {
    let heads: Vec<&ChunkRecord> = chunks
        .iter()
        .filter(|chunk| chunk.left_chunk_id.is_none())
        .collect();
    assert_eq!(heads.len(), 1, "exactly one chunk must head the chain");

    let mut ordered = vec![heads[0].clone()];
    while let Some(next_id) = ordered.last().and_then(|c| c.right_chunk_id.clone()) {
        let next = chunks
            .iter()
            .find(|chunk| chunk.id == next_id)
            .expect("right reference must resolve");
        ordered.push(next.clone());
    }
    ordered
}

fn assert_link_symmetry(ordered: &[ChunkRecord]) {
    for pair in ordered.windows(2) {
        assert_eq!(pair[0].right_chunk_id.as_deref(), Some(pair[1].id.as_str()));
        assert_eq!(pair[1].left_chunk_id.as_deref(), Some(pair[0].id.as_str()));
    }
    assert!(ordered.first().unwrap().left_chunk_id.is_none());
    assert!(ordered.last().unwrap().right_chunk_id.is_none());
}

#[tokio::test]
async fn processes_a_short_source_into_one_linked_chunk() {
    let store = Arc::new(MemoryStore::new());
    let download_id = store
        .seed_download(
            "src-1",
            wp_body(
                "<p>One small paragraph with a <a href=\"/x\">link</a>.</p>",
                "2024-04-02T10:00:00",
            ),
        )
        .await;
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));

    let outcome = pipeline.process_source("src-1").await.unwrap();
    assert_eq!(outcome.chunk_count, 1);

    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.id, outcome.document_id);
    assert_eq!(document.source_id, "src-1");
    assert_eq!(document.download_id, download_id);
    assert_eq!(document.format, "md");
    assert_eq!(document.min_chunk_size, 212);
    assert_eq!(document.max_chunk_size, 64);
    assert_eq!(
        document.published_at.to_rfc3339(),
        "2024-03-01T09:30:00+00:00"
    );

    let chunks = store.chunks_for_document(&document.id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].left_chunk_id.is_none());
    assert!(chunks[0].right_chunk_id.is_none());
    assert_eq!(chunks[0].tokenizer, "cl100k_base");
    assert_eq!(chunks[0].byte_size as usize, chunks[0].body.len());

    let embedding = store
        .embedding_for_chunk(&chunks[0].id)
        .await
        .unwrap()
        .expect("chunk must carry an embedding");
    assert_eq!(embedding.dimension, embedding.vector.len());
    assert_eq!(embedding.dimension, 8);
    assert_eq!(embedding.model, "mock-embedder");

    let metadata = store.metadata_for_document(&document.id).await.unwrap();
    let keys: Vec<&str> = metadata.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "document_title",
            "document_description",
            "links_count",
            "canonical_url"
        ]
    );
    assert_eq!(metadata[0].value, serde_json::json!("Chunking Guide"));
    assert_eq!(metadata[2].value, serde_json::json!(1));
}

#[tokio::test]
async fn long_documents_chain_chunks_in_document_order() {
    let store = Arc::new(MemoryStore::new());
    let body = wp_body(&long_content_html(), "2024-04-02T10:00:00");
    store.seed_download("src-long", body.clone()).await;

    let max_context = 16;
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, max_context));
    let outcome = pipeline.process_source("src-long").await.unwrap();

    let normalized = docloom::normalize::wp_payload(&body).unwrap();
    let chunker = TokenChunker::new(TokenizerKind::Cl100kBase).unwrap();
    let total_tokens = chunker.count_tokens(&normalized.content);
    assert!(total_tokens > max_context, "fixture must force splitting");
    assert_eq!(outcome.chunk_count, total_tokens.div_ceil(max_context));

    let chunks = store.chunks_for_document(&outcome.document_id).await.unwrap();
    let ordered = traverse(&chunks);
    assert_eq!(ordered.len(), chunks.len());
    assert_link_symmetry(&ordered);

    // Insertion order equals chain order.
    let insertion_ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    let chain_ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(insertion_ids, chain_ids);

    // Full windows carry exactly max_context tokens; traversal rebuilds the
    // normalized document text.
    for chunk in &ordered[..ordered.len() - 1] {
        assert_eq!(chunk.token_count as usize, max_context);
    }
    let rebuilt: String = ordered.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(rebuilt, normalized.content);

    for chunk in &ordered {
        let embedding = store.embedding_for_chunk(&chunk.id).await.unwrap().unwrap();
        assert_eq!(embedding.dimension, embedding.vector.len());
    }
}

#[tokio::test]
async fn reprocessing_updates_the_document_and_replaces_chunks() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_download(
            "src-1",
            wp_body("<p>First revision body.</p>", "2024-04-02T10:00:00"),
        )
        .await;
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));
    let first = pipeline.process_source("src-1").await.unwrap();
    let first_chunks = store.chunks_for_document(&first.document_id).await.unwrap();

    let second_download = store
        .seed_download(
            "src-1",
            wp_body(
                "<p>Second revision body, slightly longer than before.</p>",
                "2024-05-06T08:00:00",
            ),
        )
        .await;
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));
    let second = pipeline.process_source("src-1").await.unwrap();

    // Same document row, updated in place with the second run's values.
    assert_eq!(first.document_id, second.document_id);
    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].download_id, second_download);
    assert_eq!(
        documents[0].modified_at.to_rfc3339(),
        "2024-05-06T08:00:00+00:00"
    );

    // The previous generation is gone, not accumulated.
    assert_eq!(second.purged.chunks, first_chunks.len() as u64);
    let chunks = store.chunks_for_document(&second.document_id).await.unwrap();
    assert!(
        chunks.iter().all(|c| !first_chunks.iter().any(|f| f.id == c.id)),
        "no chunk from the first run may survive"
    );
    assert!(chunks[0].body.contains("Second revision"));

    let metadata = store
        .metadata_for_document(&second.document_id)
        .await
        .unwrap();
    assert_eq!(metadata.len(), 4, "metadata rows are replaced, not appended");
}

#[tokio::test]
async fn provider_failure_aborts_the_document_but_keeps_committed_chunks() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_download("src-long", wp_body(&long_content_html(), "2024-04-02T10:00:00"))
        .await;

    // Fail embedding of the third chunk (call index 2).
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 16).with_failure_on_call(2));
    let err = pipeline.process_source("src-long").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));

    // Chunks 0 and 1 and their embeddings were committed before the failure
    // and stay; no document row was written this run.
    assert!(store.documents().await.is_empty());
    let chunks = store.all_chunks().await;
    assert_eq!(chunks.len(), 2);
    for chunk in &chunks {
        let embedding = store.embedding_for_chunk(&chunk.id).await.unwrap();
        assert!(embedding.is_some());
    }
    // The second chunk's right reference was never patched.
    assert!(chunks[1].right_chunk_id.is_none());
}

#[tokio::test]
async fn a_failing_source_does_not_abort_its_siblings() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_download(
            "src-bad",
            wp_body("<p>fine body</p>", "not-a-timestamp"),
        )
        .await;
    store
        .seed_download(
            "src-good",
            wp_body("<p>healthy body</p>", "2024-04-02T10:00:00"),
        )
        .await;

    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));
    let summary = pipeline
        .run(vec!["src-bad".to_string(), "src-good".to_string()])
        .await;

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.processed(), 1);
    assert_eq!(summary.failed(), 1);

    let bad = summary
        .reports
        .iter()
        .find(|r| r.source_id == "src-bad")
        .unwrap();
    assert!(matches!(bad.result, Err(PipelineError::Parse(_))));

    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].source_id, "src-good");
}

#[tokio::test]
async fn missing_download_surfaces_as_a_storage_error() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));
    let err = pipeline.process_source("src-unknown").await.unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));
}

#[tokio::test]
async fn empty_content_still_produces_one_chunk() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_download("src-empty", wp_body("", "2024-04-02T10:00:00"))
        .await;
    let pipeline = build_pipeline(&store, MockEmbedder::new(8, 64));
    let outcome = pipeline.process_source("src-empty").await.unwrap();

    assert_eq!(outcome.chunk_count, 1);
    let chunks = store.chunks_for_document(&outcome.document_id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].body, "");
    assert_eq!(chunks[0].token_count, 0);
}
