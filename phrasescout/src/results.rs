/// Result types for phrase matching.
///
/// A [`Match`] owns its strings so that results can cross the worker pool
/// boundary (and be serialized to JSON) without borrowing from the text that
/// produced them. Offsets are character positions and are only meaningful
/// against the exact string that was matched.
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// A window of text that matched (or scored against) a search phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// The rendered window: its words joined with single spaces
    pub text: String,
    /// The search phrase the window was compared with
    pub search: String,
    /// Similarity in `[0, 1]`; 1 means identical
    pub score: f64,
    /// Character offset of the window start
    pub start: usize,
    /// Character offset one past the window end
    pub end: usize,
}

impl Match {
    /// Number of words in the rendered window
    pub fn word_count(&self) -> usize {
        self.text.split(' ').filter(|w| !w.is_empty()).count()
    }

    /// Byte range of this match inside `source`, if the offsets fit
    pub fn byte_range(&self, source: &str) -> Option<Range<usize>> {
        char_span_to_bytes(source, self.start, self.end)
    }
}

/// Converts a half-open character span into a byte range of `text`.
///
/// Returns `None` when the span is reversed or extends past the end.
pub fn char_span_to_bytes(text: &str, start: usize, end: usize) -> Option<Range<usize>> {
    if start > end {
        return None;
    }
    let mut boundaries = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()));
    let start_byte = boundaries.nth(start)?;
    let end_byte = if end == start {
        start_byte
    } else {
        boundaries.nth(end - start - 1)?
    };
    Some(start_byte..end_byte)
}

/// All matches found in a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatches {
    /// The path to the document
    pub path: PathBuf,
    /// Ranked matches for the document
    pub matches: Vec<Match>,
}

/// Aggregated results of matching a set of documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchReport {
    /// Results per document
    pub documents: Vec<DocumentMatches>,
    /// Total number of matches across all documents
    pub total_matches: usize,
    /// Total number of documents searched
    pub documents_searched: usize,
    /// Number of documents with at least one match
    pub documents_with_matches: usize,
    /// Documents that could not be extracted, with the reason
    #[serde(default)]
    pub failed: Vec<(PathBuf, String)>,
}

impl MatchReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a document's matches to the report
    pub fn add_document(&mut self, document: DocumentMatches) {
        self.documents_searched += 1;
        if !document.matches.is_empty() {
            self.total_matches += document.matches.len();
            self.documents_with_matches += 1;
        }
        self.documents.push(document);
    }

    /// Records a document that could not be searched
    pub fn add_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failed.push((path, reason.into()));
    }

    /// Merges another report into this one
    pub fn merge(&mut self, other: MatchReport) {
        self.total_matches += other.total_matches;
        self.documents_searched += other.documents_searched;
        self.documents_with_matches += other.documents_with_matches;
        self.documents.extend(other.documents);
        self.failed.extend(other.failed);
    }

    /// Best scoring match across all documents
    pub fn best(&self) -> Option<(&DocumentMatches, &Match)> {
        self.documents
            .iter()
            .flat_map(|doc| doc.matches.iter().map(move |m| (doc, m)))
            .max_by(|(_, a), (_, b)| a.score.total_cmp(&b.score))
    }
}
