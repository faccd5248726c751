//! Lexical text matching.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

/// Lowercased word tokens in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().trim_matches('\'').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Text match score of `query` against `content`.
///
/// 1.0 when the whole query occurs in the content (case-insensitive),
/// otherwise the fraction of distinct query terms present in the content.
pub fn text_match(query: &str, content: &str) -> f64 {
    let query = query.trim();
    if query.is_empty() {
        return 0.0;
    }

    let content_lower = content.to_lowercase();
    if content_lower.contains(&query.to_lowercase()) {
        return 1.0;
    }

    let terms: HashSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() {
        return 0.0;
    }
    let words: HashSet<String> = tokenize(&content_lower).into_iter().collect();
    let found = terms.iter().filter(|t| words.contains(*t)).count();
    found as f64 / terms.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Walking, by the RIVER's edge!"),
            vec!["walking", "by", "the", "river's", "edge"]
        );
    }

    #[test]
    fn test_phrase_match_is_full_score() {
        assert_eq!(text_match("River Walk", "a long river walk at dusk"), 1.0);
    }

    #[test]
    fn test_partial_terms() {
        let score = text_match("river mountain", "the river was cold");
        assert!((score - 0.5).abs() < 1e-9);

        // Duplicated terms count once
        let score = text_match("river river mountain", "the river was cold");
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_and_empty() {
        assert_eq!(text_match("ocean", "the river was cold"), 0.0);
        assert_eq!(text_match("   ", "anything"), 0.0);
    }
}
