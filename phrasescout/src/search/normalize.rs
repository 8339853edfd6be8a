use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalizes a search phrase for comparison: trimmed, internal whitespace
/// collapsed to single spaces, then case-folded with [`fold_case`] so it
/// compares equal to text folded the same way.
pub fn normalize_phrase(phrase: &str) -> String {
    fold_case(&WHITESPACE_RUN.replace_all(phrase.trim(), " "))
}

/// Lower-cases text one character at a time, keeping the character count.
///
/// Characters whose lower-case form expands to several characters (e.g. `İ`)
/// are left unchanged so that character offsets computed on the result are
/// valid against the original text.
pub fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(single), None) => single,
                _ => c,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("  Quick \t BROWN\nFox "), "quick brown fox");
        assert_eq!(normalize_phrase("fox"), "fox");
        assert_eq!(normalize_phrase("   "), "");
    }

    #[test]
    fn test_fold_case_preserves_char_count() {
        let text = "İstanbul ÆSIR Straße";
        let folded = fold_case(text);
        assert_eq!(folded.chars().count(), text.chars().count());
        assert_eq!(folded, "İstanbul æsir straße");
    }

    #[test]
    fn test_phrase_and_text_fold_alike() {
        let phrase = normalize_phrase(" İstanbul  ÆSIR ");
        assert_eq!(phrase, "İstanbul æsir");
        assert!(fold_case("Visit İSTANBUL ÆSIR now").contains(&phrase));
    }

    #[test]
    fn test_fold_case_ascii() {
        assert_eq!(fold_case("The Quick Brown Fox"), "the quick brown fox");
    }
}
