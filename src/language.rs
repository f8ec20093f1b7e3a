//! Natural-language detection seam.
//!
//! Detection is best effort: the trait is total and a detector that cannot
//! reach a confident verdict returns `None`, which the pipeline records as an
//! absent `natural_lang`. A failed detection never aborts a document.

/// Pluggable language detector over normalized plain text.
pub trait LanguageDetector: Send + Sync {
    /// Returns a lowercase language name (e.g. `"english"`), or `None` when
    /// the text gives no confident signal.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Minimum stopword occurrences before a verdict is reported.
const MIN_HITS: usize = 4;

const TABLES: &[(&str, &[&str])] = &[
    (
        "english",
        &[
            "the", "and", "of", "to", "in", "is", "that", "for", "with", "was", "are", "this",
        ],
    ),
    (
        "french",
        &[
            "le", "la", "les", "des", "une", "et", "est", "dans", "pour", "que", "qui", "sur",
        ],
    ),
    (
        "spanish",
        &[
            "el", "los", "las", "una", "es", "en", "y", "por", "con", "para", "como", "más",
        ],
    ),
    (
        "german",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "für", "auf", "von",
        ],
    ),
];

/// Stopword-frequency detector over a small built-in language table.
///
/// Scores each language by the number of stopword tokens present in the text
/// and reports the best-scoring language once it clears [`MIN_HITS`]. Ties go
/// to the earlier table entry, so heavily mixed text degrades predictably.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopwordDetector;

impl StopwordDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for StopwordDetector {
    fn detect(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return None;
        }

        let mut best: Option<(&str, usize)> = None;
        for (name, stopwords) in TABLES {
            let hits = words
                .iter()
                .filter(|word| stopwords.contains(*word))
                .count();
            let beats_current = match best {
                Some((_, top)) => hits > top,
                None => true,
            };
            if hits >= MIN_HITS && beats_current {
                best = Some((name, hits));
            }
        }
        best.map(|(name, _)| name.to_string())
    }
}
