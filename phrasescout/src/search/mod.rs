/// This module implements windowed fuzzy phrase matching.
///
/// # Pipeline
///
/// A matching call runs four stages, all synchronous and owned by the calling
/// thread (or pool unit):
///
/// 1. **Tokenize**: split the text into maximal runs of letters, numbers and
///    hyphens, keeping character offsets
///    ```rust,ignore
///    let words: Vec<Token> = tokenize(text).collect();
///    ```
/// 2. **Slide windows**: for every start word, every phrase and every window
///    size up to that phrase's `max_window`, join the window's words with
///    single spaces
/// 3. **Score**: exact mode keeps windows equal to the phrase; fuzzy mode
///    scores each window with `1.5^-distance`
///    ```rust,ignore
///    let score = decay(distance(&window, &phrase), 1.5);
///    ```
/// 4. **Rank**: stable sort by descending score, then truncate to the cap
///
/// # Cost
///
/// Work grows with `words × Σ max_window × distance cost`, and distance is
/// quadratic in the string lengths. A per-phrase `max_window` keeps short
/// phrases cheap; a threshold lets the distance computation stop early. Large
/// inputs should go through the worker pool rather than run inline.
///
/// # Normalization
///
/// Comparison is case-sensitive. Callers wanting case-insensitive matching
/// pass phrases through [`normalize_phrase`] and text through [`fold_case`],
/// which keeps character offsets valid against the original text.
pub mod engine;
pub mod matcher;
pub mod normalize;
pub mod ranker;
pub mod scorer;
pub mod tokenizer;

pub use engine::{match_text, run_matcher};
pub use matcher::{MatchOptions, SearchSpec, WindowMatcher};
pub use normalize::{fold_case, normalize_phrase};
pub use ranker::rank;
pub use scorer::{decay, distance, distance_within, Scorer};
pub use tokenizer::{tokenize, Token, Tokenizer};
