//! Normalization of raw WordPress-JSON downloads into plain text and
//! per-document facts.
//!
//! * [`markup`] — rendered HTML to markdown-flavored text.
//! * [`wp_payload`] — payload parsing, timestamp handling, link statistics,
//!   and the metadata map persisted alongside the document.

pub mod markup;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::types::PipelineError;

pub use markup::html_to_markup;

/// Timestamp layout used by the WordPress JSON API (`*_gmt` fields,
/// implicitly UTC).
const WP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct WpPayload {
    #[serde(default)]
    title: Rendered,
    #[serde(default)]
    excerpt: Rendered,
    content: Rendered,
    #[serde(default)]
    link: String,
    date_gmt: String,
    modified_gmt: String,
}

/// Output of normalization: the chunkable text plus everything the document
/// and metadata rows need.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    /// Markdown-flavored plain text of the rendered content.
    pub content: String,
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub links_count: usize,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NormalizedDocument {
    /// Metadata rows persisted for the document, in insertion order.
    pub fn metadata_entries(&self) -> Vec<(&'static str, serde_json::Value)> {
        vec![
            ("document_title", serde_json::Value::from(self.title.as_str())),
            (
                "document_description",
                serde_json::Value::from(self.description.as_str()),
            ),
            ("links_count", serde_json::Value::from(self.links_count)),
            (
                "canonical_url",
                serde_json::Value::from(self.canonical_url.as_str()),
            ),
        ]
    }
}

/// Parses and normalizes one WordPress-JSON download body.
///
/// Malformed JSON and unparseable timestamps are fatal for the document.
pub fn wp_payload(body: &str) -> Result<NormalizedDocument, PipelineError> {
    let payload: WpPayload = serde_json::from_str(body)
        .map_err(|err| PipelineError::Parse(format!("invalid WordPress JSON payload: {err}")))?;

    let content = html_to_markup(&payload.content.rendered);
    let title = html_to_markup(&payload.title.rendered).trim().to_string();
    let description = html_to_markup(&payload.excerpt.rendered).trim().to_string();

    Ok(NormalizedDocument {
        links_count: count_links(&content),
        published_at: parse_wp_timestamp(&payload.date_gmt)?,
        modified_at: parse_wp_timestamp(&payload.modified_gmt)?,
        canonical_url: payload.link,
        content,
        title,
        description,
    })
}

/// Parses a `YYYY-MM-DDTHH:MM:SS` timestamp as UTC.
pub fn parse_wp_timestamp(raw: &str) -> Result<DateTime<Utc>, PipelineError> {
    NaiveDateTime::parse_from_str(raw, WP_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| PipelineError::Parse(format!("invalid timestamp '{raw}': {err}")))
}

/// Counts `[text](url)` link occurrences in normalized content.
pub fn count_links(content: &str) -> usize {
    static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = LINK_PATTERN
        .get_or_init(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("link pattern is valid"));
    pattern.find_iter(content).count()
}
