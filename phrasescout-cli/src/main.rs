use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use phrasescout::{
    collect_from_config,
    config::{CliOverrides, EncodingMode, ScoutConfig},
    results::{DocumentMatches, MatchReport},
    search::{
        matcher::validate_searches,
        scorer::{Scorer, DEFAULT_DECAY_BASE},
    },
    CorpusSearch, DocumentSource, IdCache, SearchSpec, Task, WorkerPool,
};
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Characters of context shown on each side of a match
const CONTEXT_CHARS: usize = 30;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct MatchArgs {
    /// Phrase to search for (can be specified multiple times)
    #[arg(short = 'p', long = "phrase")]
    phrases: Vec<String>,

    /// Widest window, in words, for the phrase at the same position
    #[arg(short = 'w', long = "window")]
    windows: Vec<usize>,

    /// YAML file with additional searches
    #[arg(long)]
    searches: Option<PathBuf>,

    /// Compare windows by equality instead of edit distance
    #[arg(long, conflicts_with = "fuzzy")]
    exact: bool,

    /// Compare windows by edit distance, overriding a configured `exact`
    #[arg(long)]
    fuzzy: bool,

    /// Drop fuzzy matches scoring below this value (0, 1]
    #[arg(short = 't', long)]
    threshold: Option<f64>,

    /// Maximum number of matches kept per document
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Match case exactly instead of normalizing phrases and text
    #[arg(long, conflicts_with = "ignore_case")]
    case_sensitive: bool,

    /// Normalize case, overriding a configured `case_sensitive`
    #[arg(long)]
    ignore_case: bool,

    /// Files to search; when given, the root directory is not walked
    files: Vec<PathBuf>,

    /// Root directory to collect documents from
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// File extensions to include (e.g. txt,md)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Number of pool units to use
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Give up on a queued task after this long (e.g. 30s)
    #[arg(long)]
    queue_timeout: Option<String>,

    /// Give up waiting on a running task after this long (e.g. 2m)
    #[arg(long)]
    task_timeout: Option<String>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long)]
    encoding: Option<String>,

    /// Configuration file layered over the default locations
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(short, long)]
    stats: bool,

    /// Matches printed per document
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Find phrase matches in documents
    Match(Box<MatchArgs>),

    /// Print the edit distance and score between two strings
    Distance {
        a: String,
        b: String,

        /// Base of the score decay
        #[arg(long, default_value_t = DEFAULT_DECAY_BASE)]
        base: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Match(args) => run_match(*args),
        Commands::Distance { a, b, base } => {
            init_logging("warn");
            if !(base.is_finite() && base > 1.0) {
                bail!("Invalid input: decay base must be greater than 1, got {}", base);
            }
            let (steps, score) = Scorer::new(base).score(&a, &b);
            println!("distance: {}", steps);
            println!("score: {:.4}", score);
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_encoding(value: &str) -> Result<EncodingMode> {
    match value.to_lowercase().as_str() {
        "failfast" => Ok(EncodingMode::FailFast),
        "lossy" => Ok(EncodingMode::Lossy),
        other => bail!("Unknown encoding mode '{}' (expected failfast or lossy)", other),
    }
}

/// `Some(true)` for the enabling flag, `Some(false)` for its negation
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

/// Builds the effective configuration: files first, then command-line values
fn build_config(args: &MatchArgs) -> Result<ScoutConfig> {
    let file_config = ScoutConfig::load_from(args.config.as_deref())
        .context("Failed to load configuration")?;

    let cli = CliOverrides {
        exact: flag_pair(args.exact, args.fuzzy),
        threshold: args.threshold,
        max_results: args.limit,
        case_sensitive: flag_pair(args.case_sensitive, args.ignore_case),
        pool_capacity: args.threads,
        queue_timeout: args.queue_timeout.clone(),
        task_timeout: args.task_timeout.clone(),
        root_path: args.root.clone(),
        file_extensions: args.extensions.as_ref().map(|e| {
            e.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }),
        ignore_patterns: args.ignore.clone(),
        encoding_mode: args.encoding.as_deref().map(parse_encoding).transpose()?,
        ..CliOverrides::default()
    };

    let mut config = file_config.merge_with_cli(cli);

    // Phrases from the command line replace configured ones
    let mut searches: Vec<SearchSpec> = args
        .phrases
        .iter()
        .enumerate()
        .map(|(i, phrase)| {
            let window = args
                .windows
                .get(i)
                .copied()
                .unwrap_or(config.default_max_window);
            SearchSpec::new(phrase.clone(), window)
        })
        .collect();
    if let Some(path) = &args.searches {
        searches.extend(ScoutConfig::load_searches(path)?);
    }
    if !searches.is_empty() {
        config.searches = searches;
    }

    Ok(config)
}

fn run_match(args: MatchArgs) -> Result<()> {
    let config = build_config(&args)?;
    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let search = CorpusSearch::from_config(&config)?;
    validate_searches(&search.searches)?;
    search.options.validate()?;

    let documents = if args.files.is_empty() {
        collect_from_config(&config)?
    } else {
        args.files.iter().cloned().map(DocumentSource::Path).collect()
    };

    let pool: WorkerPool<Task> = WorkerPool::new(config.pool_capacity)?;
    info!(
        "Matching {} searches over {} documents with {} units",
        search.searches.len(),
        documents.len(),
        pool.capacity()
    );

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(documents.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} documents")?
            .progress_chars("=>-"),
    );

    let ids = IdCache::new();
    let show_matches = !args.json && !args.stats;
    let report = search.run(&pool, documents, |document, text| {
        progress.inc(1);
        if show_matches && !document.matches.is_empty() {
            progress.suspend(|| print_document(document, text, args.top, &ids));
        }
    })?;
    progress.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
        if args.stats {
            print_pool_stats(&pool);
        }
    }

    pool.shutdown(true);
    Ok(())
}

fn print_document(document: &DocumentMatches, text: &str, top: usize, ids: &IdCache) {
    println!("\n{}", document.path.display().to_string().blue());
    for m in document.matches.iter().take(top) {
        let id = ids.id_for_key(m.search.as_str());
        let Some(range) = m.byte_range(text) else {
            continue;
        };
        let (before, hit, after) = snippet(text, range);
        println!(
            "{} {} {}{}{}",
            format!("{:.3}", m.score).green(),
            format!("[#{} {}]", id, m.search).dimmed(),
            before,
            hit.red().bold(),
            after
        );
    }
    if document.matches.len() > top {
        println!("  ... {} more", document.matches.len() - top);
    }
}

/// Splits the match and a little context, kept to the match's line
fn snippet(text: &str, range: Range<usize>) -> (&str, &str, &str) {
    let line_start = text[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[range.end..]
        .find('\n')
        .map_or(text.len(), |i| range.end + i);

    let before = &text[line_start..range.start];
    let before_start = before
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let after = &text[range.end..line_end];
    let after_end = after
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map_or(after.len(), |(i, _)| i);

    (
        &before[before_start..],
        &text[range.clone()],
        &after[..after_end],
    )
}

fn print_summary(report: &MatchReport) {
    println!(
        "\nFound {} matches in {} of {} documents",
        report.total_matches, report.documents_with_matches, report.documents_searched
    );
    for (path, reason) in &report.failed {
        println!("{} {}: {}", "skipped".yellow(), path.display(), reason);
    }
}

fn print_pool_stats(pool: &WorkerPool<Task>) {
    let stats = pool.metrics().get_stats();
    println!(
        "Tasks: {} submitted, {} completed, {} failed, peak {} running of {} units",
        stats.submitted,
        stats.completed,
        stats.failed,
        stats.peak_running,
        pool.capacity()
    );
}
