use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::extract::{DocumentSource, PlainTextExtractor, TextExtractor};
use crate::results::Match;
use crate::search::matcher::{validate_searches, MatchOptions, SearchSpec};
use crate::search::match_text;

/// A unit of work the pool can run.
///
/// `run` executes on a pool thread and consumes the job; its result (or the
/// panic it raises) is delivered to whoever submitted it.
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    fn run(self) -> SearchResult<Self::Output>;
}

/// Arguments for a matching task
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub text: String,
    pub searches: Vec<SearchSpec>,
    pub options: MatchOptions,
}

impl MatchRequest {
    pub fn new(text: impl Into<String>, searches: Vec<SearchSpec>, exact: bool) -> Self {
        Self {
            text: text.into(),
            searches,
            options: MatchOptions {
                exact,
                ..MatchOptions::default()
            },
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks searches and options without scanning the text
    pub fn validate(&self) -> SearchResult<()> {
        validate_searches(&self.searches)?;
        self.options.validate()
    }
}

/// Arguments for a text extraction task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub source: DocumentSource,
    pub encoding_mode: EncodingMode,
}

impl ExtractRequest {
    pub fn new(source: DocumentSource, encoding_mode: EncodingMode) -> Self {
        Self {
            source,
            encoding_mode,
        }
    }
}

/// The task kinds a phrasescout pool runs
#[derive(Debug, Clone)]
pub enum Task {
    /// Tokenize, match and rank one text
    MatchText(MatchRequest),
    /// Turn a document into plain text
    ExtractText(ExtractRequest),
}

/// Result shape of each [`Task`] kind
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Matches(Vec<Match>),
    Text(String),
}

impl TaskOutput {
    pub fn into_matches(self) -> SearchResult<Vec<Match>> {
        match self {
            TaskOutput::Matches(matches) => Ok(matches),
            TaskOutput::Text(_) => Err(SearchError::execution_failure(
                "match_text",
                "task produced text instead of matches",
            )),
        }
    }

    pub fn into_text(self) -> SearchResult<String> {
        match self {
            TaskOutput::Text(text) => Ok(text),
            TaskOutput::Matches(_) => Err(SearchError::execution_failure(
                "extract_text",
                "task produced matches instead of text",
            )),
        }
    }
}

impl Job for Task {
    type Output = TaskOutput;

    fn name(&self) -> &'static str {
        match self {
            Task::MatchText(_) => "match_text",
            Task::ExtractText(_) => "extract_text",
        }
    }

    fn run(self) -> SearchResult<TaskOutput> {
        match self {
            Task::MatchText(request) => {
                match_text(&request.text, &request.searches, &request.options)
                    .map(TaskOutput::Matches)
            }
            Task::ExtractText(request) => PlainTextExtractor::new(request.encoding_mode)
                .extract(&request.source)
                .map(TaskOutput::Text),
        }
    }
}
