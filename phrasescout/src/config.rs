use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};
use crate::search::matcher::{MatchOptions, SearchSpec, DEFAULT_MAX_RESULTS, DEFAULT_MAX_WINDOW};
use crate::search::scorer::DEFAULT_DECAY_BASE;

/// How to handle invalid UTF-8 when extracting plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Reject documents that are not valid UTF-8
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    Lossy,
}

/// Configuration for matching runs.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.phrasescout.yaml` in the current directory
/// 3. Global `$HOME/.config/phrasescout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Phrases to look for, each with its widest window in words
/// searches:
///   - phrase: "quick brown fox"
///     max_window: 3
///   - phrase: "lazy dog"
///
/// # Exact comparison instead of edit distance
/// exact: false
///
/// # Drop fuzzy matches scoring below this (optional)
/// threshold: 0.5
///
/// # Hard cap on matches per document
/// max_results: 1000
///
/// # Worker pool size (default: half the CPU cores)
/// pool_capacity: 4
///
/// # Give up on a queued task after this long (humantime syntax)
/// queue_timeout: "30s"
///
/// # Root directory and filters for document collection
/// root_path: "docs"
/// file_extensions: ["txt", "md"]
/// ignore_patterns: ["**/drafts/**"]
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// Command-line arguments take precedence over file values, see
/// [`ScoutConfig::merge_with_cli`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Phrases to search for
    #[serde(default)]
    pub searches: Vec<SearchSpec>,

    /// Compare windows by equality instead of edit distance
    #[serde(default)]
    pub exact: bool,

    /// Optional score floor for fuzzy matches
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Maximum number of matches kept per document
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Base of the exponential score decay
    #[serde(default = "default_decay_base")]
    pub decay_base: f64,

    /// Window size used for phrases given without one
    #[serde(default = "default_max_window")]
    pub default_max_window: usize,

    /// When false, phrases are normalized and text is case-folded
    #[serde(default)]
    pub case_sensitive: bool,

    /// Number of worker units; defaults to half the CPU cores
    #[serde(default)]
    pub pool_capacity: Option<usize>,

    /// How long a task may wait for a free unit, e.g. "30s"
    #[serde(default)]
    pub queue_timeout: Option<String>,

    /// How long a caller waits for a running task, e.g. "2m"
    #[serde(default)]
    pub task_timeout: Option<String>,

    /// Root directory to collect documents from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Optional list of file extensions to include (e.g., ["txt", "md"])
    /// If None, all non-binary files are included
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Patterns to ignore (supports glob syntax)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// How to treat invalid UTF-8 in documents
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_decay_base() -> f64 {
    DEFAULT_DECAY_BASE
}

fn default_max_window() -> usize {
    DEFAULT_MAX_WINDOW
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            searches: Vec::new(),
            exact: false,
            threshold: None,
            max_results: default_max_results(),
            decay_base: default_decay_base(),
            default_max_window: default_max_window(),
            case_sensitive: false,
            pool_capacity: None,
            queue_timeout: None,
            task_timeout: None,
            root_path: default_root_path(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line. `None` and empty fields leave the
/// file value in place, so any value can override, including a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub searches: Vec<SearchSpec>,
    pub exact: Option<bool>,
    pub threshold: Option<f64>,
    pub max_results: Option<usize>,
    pub decay_base: Option<f64>,
    pub default_max_window: Option<usize>,
    pub case_sensitive: Option<bool>,
    pub pool_capacity: Option<usize>,
    pub queue_timeout: Option<String>,
    pub task_timeout: Option<String>,
    pub root_path: Option<PathBuf>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

/// A standalone list of searches, as read by `--searches FILE`
#[derive(Debug, Clone, Deserialize)]
struct SearchList {
    searches: Vec<SearchSpec>,
}

impl ScoutConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file layered over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("phrasescout/config.yaml")),
            // Local config
            Some(PathBuf::from(".phrasescout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // A custom file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Reads a YAML file holding either a `searches:` mapping or a bare list
    pub fn load_searches(path: &Path) -> SearchResult<Vec<SearchSpec>> {
        let content = std::fs::read_to_string(path).map_err(|e| SearchError::from_io(path, e))?;
        if let Ok(list) = serde_yaml::from_str::<SearchList>(&content) {
            return Ok(list.searches);
        }
        serde_yaml::from_str::<Vec<SearchSpec>>(&content)
            .map_err(|e| SearchError::config_error(format!("Failed to parse searches: {}", e)))
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        // CLI values take precedence over config file values
        if !cli.searches.is_empty() {
            self.searches = cli.searches;
        }
        if let Some(exact) = cli.exact {
            self.exact = exact;
        }
        if cli.threshold.is_some() {
            self.threshold = cli.threshold;
        }
        if let Some(max_results) = cli.max_results {
            self.max_results = max_results;
        }
        if let Some(decay_base) = cli.decay_base {
            self.decay_base = decay_base;
        }
        if let Some(window) = cli.default_max_window {
            self.default_max_window = window;
        }
        if let Some(case_sensitive) = cli.case_sensitive {
            self.case_sensitive = case_sensitive;
        }
        if cli.pool_capacity.is_some() {
            self.pool_capacity = cli.pool_capacity;
        }
        if cli.queue_timeout.is_some() {
            self.queue_timeout = cli.queue_timeout;
        }
        if cli.task_timeout.is_some() {
            self.task_timeout = cli.task_timeout;
        }
        if let Some(root) = cli.root_path {
            self.root_path = root;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Matching options described by this configuration
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            exact: self.exact,
            threshold: self.threshold,
            max_results: self.max_results,
            decay_base: self.decay_base,
        }
    }

    /// Parsed queue wait budget
    pub fn queue_timeout(&self) -> SearchResult<Option<Duration>> {
        parse_duration_field("queue_timeout", self.queue_timeout.as_deref())
    }

    /// Parsed task wait budget
    pub fn task_timeout(&self) -> SearchResult<Option<Duration>> {
        parse_duration_field("task_timeout", self.task_timeout.as_deref())
    }
}

fn parse_duration_field(field: &str, value: Option<&str>) -> SearchResult<Option<Duration>> {
    value
        .map(|raw| {
            humantime::parse_duration(raw).map_err(|e| {
                SearchError::config_error(format!("Invalid {} '{}': {}", field, raw, e))
            })
        })
        .transpose()
}
