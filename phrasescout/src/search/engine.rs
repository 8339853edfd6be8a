use tracing::debug;

use super::matcher::{MatchOptions, SearchSpec, WindowMatcher};
use super::ranker::rank;
use crate::errors::SearchResult;
use crate::results::Match;

/// Matches `text` against `searches`, returning at most
/// `options.max_results` matches ordered by descending score.
///
/// Invalid searches or options are reported before any text is scanned.
pub fn match_text(
    text: &str,
    searches: &[SearchSpec],
    options: &MatchOptions,
) -> SearchResult<Vec<Match>> {
    let matcher = WindowMatcher::new(searches.to_vec(), *options)?;
    Ok(run_matcher(&matcher, text))
}

/// Runs an already validated matcher and ranks its output
pub fn run_matcher(matcher: &WindowMatcher, text: &str) -> Vec<Match> {
    let found = matcher.find_matches(text);
    let raw_count = found.len();
    let ranked = rank(found, matcher.options().max_results);

    debug!(
        "Matched {} searches: {} raw matches, {} kept",
        matcher.searches().len(),
        raw_count,
        ranked.len()
    );

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;

    #[test]
    fn test_exact_quick_brown() {
        let matches = match_text(
            "the quick brown fox",
            &[SearchSpec::new("quick brown", 2)],
            &MatchOptions::exact(),
        )
        .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "quick brown");
        assert_eq!(matches[0].score, 1.0);
        assert_eq!((matches[0].start, matches[0].end), (4, 15));
    }

    #[test]
    fn test_fuzzy_results_are_ranked() {
        let matches = match_text(
            "the quick brown fox jumps over the lazy dog",
            &[SearchSpec::new("lazy dog", 2)],
            &MatchOptions::fuzzy(),
        )
        .unwrap();
        assert_eq!(matches[0].text, "lazy dog");
        assert_eq!(matches[0].score, 1.0);
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_cap_keeps_top_scores() {
        // 1200 single-word windows plus one exact hit
        let mut text = vec!["filler"; 1200].join(" ");
        text.push_str(" needle");
        let matches = match_text(
            &text,
            &[SearchSpec::new("needle", 1)],
            &MatchOptions::fuzzy(),
        )
        .unwrap();
        assert_eq!(matches.len(), 1000);
        assert_eq!(matches[0].text, "needle");
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let text = "alpha beta gamma beta alpha gamma delta beta";
        let searches = [SearchSpec::new("beta", 2), SearchSpec::new("gamma", 1)];
        let first = match_text(text, &searches, &MatchOptions::fuzzy()).unwrap();
        let second = match_text(text, &searches, &MatchOptions::fuzzy()).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_invalid_input_is_synchronous() {
        let err = match_text("text", &[], &MatchOptions::default()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }
}
