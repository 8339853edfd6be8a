use crate::results::Match;

/// Sorts matches by descending score and keeps the first `limit`.
///
/// The sort is stable: matches with equal scores keep their discovery order,
/// so identical input always produces identical output.
pub fn rank(mut matches: Vec<Match>, limit: usize) -> Vec<Match> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(limit);
    matches
}
