//! Runnable wiring demo: seeds two WordPress-JSON downloads into the
//! in-process store, runs the pipeline with the deterministic mock embedder,
//! and prints what was persisted.
//!
//! ```text
//! cargo run --example wp_ingest
//! ```

use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use docloom::embedding::MockEmbedder;
use docloom::pipeline::{Pipeline, PipelineConfig};
use docloom::store::{DocumentStore, MemoryStore, RawDocumentSource};
use docloom::types::PipelineError;

fn sample_post(title: &str, body_html: &str, link: &str) -> String {
    serde_json::json!({
        "title": {"rendered": title},
        "excerpt": {"rendered": "<p>Demo excerpt.</p>"},
        "content": {"rendered": body_html},
        "link": link,
        "date_gmt": "2024-03-01T09:30:00",
        "modified_gmt": "2024-04-02T10:00:00"
    })
    .to_string()
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let store = Arc::new(MemoryStore::new());
    store
        .seed_download(
            "demo-post-1",
            sample_post(
                "Linked Chunks",
                "<h1>Linked Chunks</h1><p>Every chunk knows its neighbors, so the \
                 <a href=\"/retrieval\">retrieval layer</a> can walk the document \
                 without rescanning it.</p>",
                "https://example.com/linked-chunks",
            ),
        )
        .await;
    store
        .seed_download(
            "demo-post-2",
            sample_post(
                "Token Windows",
                "<h1>Token Windows</h1><p>Long documents split into windows bounded \
                 by the embedding model's input limit, in document order.</p>",
                "https://example.com/token-windows",
            ),
        )
        .await;

    let as_store: Arc<dyn DocumentStore> = store.clone();
    let as_downloads: Arc<dyn RawDocumentSource> = store.clone();
    let pipeline = Arc::new(
        Pipeline::builder()
            .store(as_store)
            .downloads(as_downloads)
            .embedder(Arc::new(MockEmbedder::new(1536, 8191)))
            .config(PipelineConfig {
                concurrency: 2,
                ..PipelineConfig::default()
            })
            .build()?,
    );

    let summary = pipeline
        .run(vec!["demo-post-1".to_string(), "demo-post-2".to_string()])
        .await;

    println!("\nIngestion complete");
    println!("  sources processed : {}", summary.processed());
    println!("  sources failed    : {}", summary.failed());
    println!("  total time        : {:?}", summary.elapsed);

    for report in &summary.reports {
        let Ok(outcome) = &report.result else {
            continue;
        };
        println!("\nsource {}", report.source_id);
        let chunks = store.chunks_for_document(&outcome.document_id).await?;
        for chunk in &chunks {
            println!(
                "  chunk {} tokens={} left={} right={}",
                &chunk.id[..8],
                chunk.token_count,
                chunk.left_chunk_id.as_deref().map_or("-", |id| &id[..8]),
                chunk.right_chunk_id.as_deref().map_or("-", |id| &id[..8]),
            );
        }
        let metadata = store.metadata_for_document(&outcome.document_id).await?;
        for row in &metadata {
            println!("  meta {} = {}", row.key, row.value);
        }
    }

    Ok(())
}
