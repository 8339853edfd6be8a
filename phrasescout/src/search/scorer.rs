//! Edit distance and similarity scoring.
//!
//! Distances use the restricted Damerau–Levenshtein metric (optimal string
//! alignment): insertions, deletions, substitutions and transpositions of two
//! adjacent characters, each costing one step. Comparison is per `char`, so
//! multi-byte characters count as a single step.

/// Default base of the decay function
pub const DEFAULT_DECAY_BASE: f64 = 1.5;

/// Computes the edit distance between `a` and `b`
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    osa_distance(&a, &b, usize::MAX).unwrap_or(usize::MAX)
}

/// Computes the edit distance between `a` and `b`, giving up with `None` as
/// soon as it is certain to exceed `limit`.
pub fn distance_within(a: &str, b: &str, limit: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    osa_distance(&a, &b, limit)
}

/// Three-row optimal string alignment distance over character slices.
pub(crate) fn osa_distance(a: &[char], b: &[char], limit: usize) -> Option<usize> {
    if a.len().abs_diff(b.len()) > limit {
        return None;
    }
    if a.is_empty() {
        return Some(b.len());
    }
    if b.is_empty() {
        return Some(a.len());
    }

    let width = b.len() + 1;
    let mut before_prev: Vec<usize> = vec![0; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut current: Vec<usize> = vec![0; width];
    let mut prev_row_min = 0;

    for i in 1..=a.len() {
        current[0] = i;
        let mut row_min = i;

        for j in 1..width {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (prev[j] + 1)
                .min(current[j - 1] + 1)
                .min(prev[j - 1] + cost);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(before_prev[j - 2] + 1);
            }

            current[j] = value;
            row_min = row_min.min(value);
        }

        // A transposition can reach back two rows, so only bail out once two
        // consecutive rows are over the limit.
        if row_min > limit && prev_row_min > limit {
            return None;
        }
        prev_row_min = row_min;

        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
    }

    let result = prev[b.len()];
    (result <= limit).then_some(result)
}

/// Maps a step count in `[0, ∞)` to a similarity score in `(0, 1]`:
/// `base^(-steps)`.
pub fn decay(steps: usize, base: f64) -> f64 {
    let steps = i32::try_from(steps).unwrap_or(i32::MAX);
    base.powi(-steps).clamp(0.0, 1.0)
}

/// Largest step count whose decayed score still reaches `threshold`.
///
/// Used to bound distance computation when a threshold filter is active.
pub fn max_steps_for(threshold: f64, base: f64) -> usize {
    if threshold <= 0.0 {
        return usize::MAX;
    }
    if threshold >= 1.0 {
        return 0;
    }
    let mut steps = (threshold.ln() / base.recip().ln()).floor().max(0.0) as usize;
    // Guard against rounding at the boundary
    while decay(steps + 1, base) >= threshold {
        steps += 1;
    }
    while steps > 0 && decay(steps, base) < threshold {
        steps -= 1;
    }
    steps
}

/// Scores two strings with the given decay base
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    base: f64,
}

impl Scorer {
    pub fn new(base: f64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Score for a known step count
    pub fn score_steps(&self, steps: usize) -> f64 {
        decay(steps, self.base)
    }

    /// Distance and score between two strings
    pub fn score(&self, a: &str, b: &str) -> (usize, f64) {
        let steps = distance(a, b);
        (steps, self.score_steps(steps))
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(distance("", ""), 0);
        assert_eq!(distance("kitten", "kitten"), 0);
    }

    #[test]
    fn test_empty_against_non_empty() {
        assert_eq!(distance("", "abc"), 3);
        assert_eq!(distance("abcd", ""), 4);
    }

    #[test]
    fn test_classic_levenshtein_cases() {
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("flaw", "lawn"), 2);
        assert_eq!(distance("quick brown", "quick brwn"), 1);
    }

    #[test]
    fn test_adjacent_transposition_costs_one() {
        assert_eq!(distance("ab", "ba"), 1);
        assert_eq!(distance("recieve", "receive"), 1);
        assert_eq!(distance("teh quick", "the quick"), 1);
    }

    #[test]
    fn test_restricted_transposition() {
        // Optimal string alignment never edits a transposed pair twice
        assert_eq!(distance("ca", "abc"), 3);
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        assert_eq!(distance("café", "cafe"), 1);
        assert_eq!(distance("東京", "京東"), 1);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [("search", "serach"), ("phrase", "phase"), ("a", "xyz")];
        for (a, b) in pairs {
            assert_eq!(distance(a, b), distance(b, a));
        }
    }

    #[test]
    fn test_distance_within_limit() {
        assert_eq!(distance_within("kitten", "sitting", 3), Some(3));
        assert_eq!(distance_within("kitten", "sitting", 2), None);
        assert_eq!(distance_within("a", "abcdef", 2), None);
        assert_eq!(distance_within("abcdef", "abcdef", 0), Some(0));
        assert_eq!(distance_within("", "ab", 2), Some(2));
    }

    #[test]
    fn test_distance_within_agrees_with_distance() {
        let words = ["receive", "recieve", "deceive", "reception", "eve", ""];
        for a in words {
            for b in words {
                let full = distance(a, b);
                for limit in 0..10 {
                    let bounded = distance_within(a, b, limit);
                    if full <= limit {
                        assert_eq!(bounded, Some(full), "{a} vs {b} limit {limit}");
                    } else {
                        assert_eq!(bounded, None, "{a} vs {b} limit {limit}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_decay_values() {
        assert_eq!(decay(0, DEFAULT_DECAY_BASE), 1.0);
        assert!((decay(1, 1.5) - 2.0 / 3.0).abs() < 1e-12);
        assert!((decay(2, 1.5) - 4.0 / 9.0).abs() < 1e-12);
        assert!((decay(3, 2.0) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_decay_is_strictly_decreasing_and_bounded() {
        let mut previous = decay(0, DEFAULT_DECAY_BASE);
        for steps in 1..60 {
            let score = decay(steps, DEFAULT_DECAY_BASE);
            assert!(score < previous);
            assert!(score > 0.0 && score <= 1.0);
            previous = score;
        }
        let huge = decay(usize::MAX, DEFAULT_DECAY_BASE);
        assert!((0.0..=1.0).contains(&huge));
    }

    #[test]
    fn test_score_is_one_only_for_zero_distance() {
        let scorer = Scorer::default();
        let (steps, score) = scorer.score("fox", "fox");
        assert_eq!(steps, 0);
        assert_eq!(score, 1.0);

        let (steps, score) = scorer.score("fox", "box");
        assert_eq!(steps, 1);
        assert!(score < 1.0);
    }

    #[test]
    fn test_max_steps_for_threshold() {
        // 1.5^-1 = 0.667, 1.5^-2 = 0.444
        assert_eq!(max_steps_for(0.5, 1.5), 1);
        assert_eq!(max_steps_for(0.4, 1.5), 2);
        assert_eq!(max_steps_for(1.0, 1.5), 0);
        assert_eq!(max_steps_for(0.125, 2.0), 3);
        for steps in 0..8 {
            let threshold = decay(steps, 1.5);
            assert_eq!(max_steps_for(threshold, 1.5), steps);
        }
    }
}
