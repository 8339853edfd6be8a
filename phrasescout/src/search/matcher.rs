use serde::{Deserialize, Serialize};
use tracing::trace;

use super::scorer::{max_steps_for, osa_distance, Scorer, DEFAULT_DECAY_BASE};
use super::tokenizer::{tokenize, Token};
use crate::errors::{SearchError, SearchResult};
use crate::results::Match;

/// Default hard cap on the number of matches returned per call
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Default number of words a window may span
pub const DEFAULT_MAX_WINDOW: usize = 3;

/// A phrase to look for and the widest window (in words) to compare it with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchSpec {
    /// The phrase, already normalized the same way as the text
    pub phrase: String,
    /// Maximum number of words per window, at least 1
    #[serde(default = "default_max_window")]
    pub max_window: usize,
}

fn default_max_window() -> usize {
    DEFAULT_MAX_WINDOW
}

impl SearchSpec {
    pub fn new(phrase: impl Into<String>, max_window: usize) -> Self {
        Self {
            phrase: phrase.into(),
            max_window,
        }
    }

    /// A search whose window is as wide as the phrase has words
    pub fn sized_to_phrase(phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        let max_window = tokenize(&phrase).count().max(1);
        Self { phrase, max_window }
    }
}

/// Tunables for one matching call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Compare windows by string equality instead of edit distance
    #[serde(default)]
    pub exact: bool,
    /// Drop fuzzy matches scoring below this value
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Hard cap on returned matches
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Base of the score decay, must be greater than 1
    #[serde(default = "default_decay_base")]
    pub decay_base: f64,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_decay_base() -> f64 {
    DEFAULT_DECAY_BASE
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            exact: false,
            threshold: None,
            max_results: DEFAULT_MAX_RESULTS,
            decay_base: DEFAULT_DECAY_BASE,
        }
    }
}

impl MatchOptions {
    pub fn exact() -> Self {
        Self {
            exact: true,
            ..Self::default()
        }
    }

    pub fn fuzzy() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_decay_base(mut self, decay_base: f64) -> Self {
        self.decay_base = decay_base;
        self
    }

    /// Checks the options, reporting the first problem found
    pub fn validate(&self) -> SearchResult<()> {
        if self.max_results == 0 {
            return Err(SearchError::invalid_input("max_results must be at least 1"));
        }
        if !(self.decay_base.is_finite() && self.decay_base > 1.0) {
            return Err(SearchError::invalid_input(format!(
                "decay_base must be a finite number greater than 1, got {}",
                self.decay_base
            )));
        }
        if let Some(threshold) = self.threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(SearchError::invalid_input(format!(
                    "threshold must be in (0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

/// Validates a list of search specs before any work is dispatched
pub fn validate_searches(searches: &[SearchSpec]) -> SearchResult<()> {
    if searches.is_empty() {
        return Err(SearchError::invalid_input("search list is empty"));
    }
    for spec in searches {
        if spec.phrase.trim().is_empty() {
            return Err(SearchError::invalid_input("search phrase is empty"));
        }
        if spec.max_window < 1 {
            return Err(SearchError::invalid_input(format!(
                "max_window for \"{}\" must be at least 1",
                spec.phrase
            )));
        }
    }
    Ok(())
}

/// Per-phrase state reused across windows
struct PreparedSearch<'s> {
    phrase: &'s str,
    chars: Vec<char>,
    max_window: usize,
}

/// Slides word windows over a text and scores them against search phrases
#[derive(Debug, Clone)]
pub struct WindowMatcher {
    searches: Vec<SearchSpec>,
    options: MatchOptions,
    scorer: Scorer,
}

impl WindowMatcher {
    /// Creates a matcher after validating the searches and options
    pub fn new(searches: Vec<SearchSpec>, options: MatchOptions) -> SearchResult<Self> {
        validate_searches(&searches)?;
        options.validate()?;
        Ok(Self {
            searches,
            scorer: Scorer::new(options.decay_base),
            options,
        })
    }

    pub fn searches(&self) -> &[SearchSpec] {
        &self.searches
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Scores every window of every phrase against `text`.
    ///
    /// Matches come back unranked, in discovery order: by start word, then by
    /// search, then by window size.
    pub fn find_matches(&self, text: &str) -> Vec<Match> {
        let words: Vec<Token<'_>> = tokenize(text).collect();
        let prepared: Vec<PreparedSearch<'_>> = self
            .searches
            .iter()
            .map(|spec| PreparedSearch {
                phrase: &spec.phrase,
                chars: spec.phrase.chars().collect(),
                max_window: spec.max_window,
            })
            .collect();

        let step_limit = match (self.options.exact, self.options.threshold) {
            (false, Some(threshold)) => max_steps_for(threshold, self.scorer.base()),
            _ => usize::MAX,
        };

        trace!(
            "Matching {} words against {} searches (exact: {})",
            words.len(),
            prepared.len(),
            self.options.exact
        );

        let mut matches = Vec::new();
        let mut window_text = String::new();
        let mut window_chars: Vec<char> = Vec::new();

        for i in 0..words.len() {
            for search in &prepared {
                window_text.clear();
                window_chars.clear();

                for w in 1..=search.max_window {
                    if i + w > words.len() {
                        break;
                    }

                    // Grow the window by one word
                    let last = &words[i + w - 1];
                    if w > 1 {
                        window_text.push(' ');
                        window_chars.push(' ');
                    }
                    window_text.push_str(last.text);
                    window_chars.extend(last.text.chars());

                    let score = if self.options.exact {
                        if window_text == search.phrase {
                            1.0
                        } else {
                            continue;
                        }
                    } else {
                        match osa_distance(&window_chars, &search.chars, step_limit) {
                            Some(steps) => self.scorer.score_steps(steps),
                            None => continue,
                        }
                    };

                    if let Some(threshold) = self.options.threshold {
                        if score < threshold {
                            continue;
                        }
                    }

                    matches.push(Match {
                        text: window_text.clone(),
                        search: search.phrase.to_string(),
                        score,
                        start: words[i].start,
                        end: last.end,
                    });
                }
            }
        }

        matches
    }
}
