//! Keyword extraction for pattern labels.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::retrieval::tokenize;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "him", "his", "how", "its", "may", "now", "see",
        "she", "too", "use", "way", "who", "did", "get", "got", "let", "put", "say", "that",
        "this", "with", "have", "from", "they", "them", "then", "than", "what", "when",
        "were", "will", "been", "into", "just", "like", "more", "some", "such", "very",
        "your", "about", "after", "again", "being", "could", "there", "their", "these",
        "those", "which", "while", "would", "should", "where", "felt", "feel", "really",
    ]
    .into_iter()
    .collect()
});

/// Most frequent content words across `texts`, ties broken alphabetically.
pub fn extract_keywords<'a, I>(texts: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in tokenize(text) {
            if word.chars().count() < 3
                || STOPWORDS.contains(word.as_str())
                || word.chars().all(|c| c.is_numeric())
            {
                continue;
            }
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(max).map(|(w, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        let texts = [
            "Walking by the river at dawn",
            "The river was loud, walking fast",
            "River light",
        ];
        let keywords = extract_keywords(texts, 2);
        assert_eq!(keywords, vec!["river", "walking"]);
    }

    #[test]
    fn test_stopwords_and_short_words_dropped() {
        let keywords = extract_keywords(["it was that and the 2024 ok"], 5);
        assert!(keywords.is_empty());
    }
}
