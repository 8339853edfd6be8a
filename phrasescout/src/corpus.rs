use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::{EncodingMode, ScoutConfig};
use crate::errors::{SearchError, SearchResult};
use crate::extract::DocumentSource;
use crate::filters::DocumentFilter;
use crate::pool::{ExtractRequest, MatchHandle, MatchRequest, Task, TextHandle, WorkerPool};
use crate::results::{DocumentMatches, Match, MatchReport};
use crate::search::matcher::{validate_searches, MatchOptions, SearchSpec};
use crate::search::normalize::{fold_case, normalize_phrase};

/// Collects the documents to search under `root`.
///
/// The walk honors `.gitignore` and hidden-file rules, then applies the
/// filter. Paths come back sorted so repeated runs report in the same order.
pub fn collect_documents(root: &Path, filter: &DocumentFilter) -> SearchResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(SearchError::file_not_found(root));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .standard_filters(true)
        .require_git(false);
    builder.add_custom_ignore_filename(".phrasescoutignore");

    debug!("Scanning directory: {}", root.display());
    let mut documents = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if filter.should_include(relative) {
            trace!("Adding document: {}", entry.path().display());
            documents.push(entry.into_path());
        }
    }

    documents.sort();
    info!("Found {} documents under {}", documents.len(), root.display());
    Ok(documents)
}

/// Collects documents as configured by `root_path`, `file_extensions` and
/// `ignore_patterns`
pub fn collect_from_config(config: &ScoutConfig) -> SearchResult<Vec<DocumentSource>> {
    let filter = DocumentFilter::new(config.file_extensions.clone(), &config.ignore_patterns)?;
    Ok(collect_documents(&config.root_path, &filter)?
        .into_iter()
        .map(DocumentSource::Path)
        .collect())
}

/// Matching settings applied to every document of a corpus
#[derive(Debug, Clone)]
pub struct CorpusSearch {
    pub searches: Vec<SearchSpec>,
    pub options: MatchOptions,
    pub case_sensitive: bool,
    pub encoding_mode: EncodingMode,
    pub queue_timeout: Option<Duration>,
    pub task_timeout: Option<Duration>,
}

impl CorpusSearch {
    pub fn new(searches: Vec<SearchSpec>, options: MatchOptions) -> Self {
        Self {
            searches,
            options,
            case_sensitive: true,
            encoding_mode: EncodingMode::default(),
            queue_timeout: None,
            task_timeout: None,
        }
    }

    pub fn from_config(config: &ScoutConfig) -> SearchResult<Self> {
        Ok(Self {
            searches: config.searches.clone(),
            options: config.match_options(),
            case_sensitive: config.case_sensitive,
            encoding_mode: config.encoding_mode,
            queue_timeout: config.queue_timeout()?,
            task_timeout: config.task_timeout()?,
        })
    }

    /// Searches as they are sent to the matcher
    fn prepared_searches(&self) -> Vec<SearchSpec> {
        if self.case_sensitive {
            return self.searches.clone();
        }
        self.searches
            .iter()
            .map(|spec| SearchSpec::new(normalize_phrase(&spec.phrase), spec.max_window))
            .collect()
    }

    fn submit_extract(
        &self,
        pool: &WorkerPool<Task>,
        source: DocumentSource,
    ) -> SearchResult<TextHandle> {
        let task = Task::ExtractText(ExtractRequest::new(source, self.encoding_mode));
        let handle = match self.queue_timeout {
            Some(budget) => pool.run_with_queue_timeout(task, budget)?,
            None => pool.run(task)?,
        };
        Ok(TextHandle(handle))
    }

    fn submit_match(
        &self,
        pool: &WorkerPool<Task>,
        text: String,
        searches: &[SearchSpec],
    ) -> SearchResult<MatchHandle> {
        let request = MatchRequest {
            text,
            searches: searches.to_vec(),
            options: self.options,
        };
        match self.queue_timeout {
            Some(budget) => pool.submit_match_with_queue_timeout(request, budget),
            None => pool.submit_match(request),
        }
    }

    fn wait_text(&self, handle: TextHandle) -> SearchResult<String> {
        match self.task_timeout {
            Some(timeout) => handle.wait_timeout(timeout),
            None => handle.wait(),
        }
    }

    fn wait_matches(&self, handle: MatchHandle) -> SearchResult<Vec<Match>> {
        match self.task_timeout {
            Some(timeout) => handle.wait_timeout(timeout),
            None => handle.wait(),
        }
    }

    /// Extracts and matches every document on `pool`.
    ///
    /// `on_document` sees each document's ranked matches together with the
    /// extracted text, in corpus order. Documents that cannot be extracted are
    /// recorded in [`MatchReport::failed`]; pool failures abort the run.
    pub fn run<F>(
        &self,
        pool: &WorkerPool<Task>,
        documents: Vec<DocumentSource>,
        mut on_document: F,
    ) -> SearchResult<MatchReport>
    where
        F: FnMut(&DocumentMatches, &str),
    {
        validate_searches(&self.searches)?;
        self.options.validate()?;
        let searches = self.prepared_searches();

        let paths: Vec<PathBuf> = documents
            .iter()
            .map(|doc| match doc {
                DocumentSource::Path(path) => path.clone(),
                DocumentSource::Bytes { name, .. } => PathBuf::from(name),
            })
            .collect();
        let extracts = documents
            .into_iter()
            .map(|doc| self.submit_extract(pool, doc))
            .collect::<SearchResult<Vec<_>>>()?;

        let mut report = MatchReport::new();
        let mut pending = Vec::with_capacity(extracts.len());
        for (path, handle) in paths.into_iter().zip(extracts) {
            let text = match self.wait_text(handle) {
                Ok(text) => text,
                Err(e) if is_document_failure(&e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.add_failure(path, e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };
            let scanned = if self.case_sensitive {
                text.clone()
            } else {
                fold_case(&text)
            };
            let handle = self.submit_match(pool, scanned, &searches)?;
            pending.push((path, text, handle));
        }

        for (path, text, handle) in pending {
            let document = DocumentMatches {
                path,
                matches: self.wait_matches(handle)?,
            };
            trace!(
                "{} matches in {}",
                document.matches.len(),
                document.path.display()
            );
            on_document(&document, &text);
            report.add_document(document);
        }

        info!(
            "Searched {} documents: {} matches in {} documents, {} failed",
            report.documents_searched,
            report.total_matches,
            report.documents_with_matches,
            report.failed.len()
        );
        Ok(report)
    }
}

/// Errors that only concern one document
fn is_document_failure(err: &SearchError) -> bool {
    matches!(
        err,
        SearchError::Extraction { .. }
            | SearchError::FileNotFound(_)
            | SearchError::PermissionDenied(_)
            | SearchError::IoError(_)
    )
}
