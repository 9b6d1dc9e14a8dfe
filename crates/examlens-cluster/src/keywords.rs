//! Salient keyword extraction for the keyword similarity backend.

use std::collections::HashSet;

/// Function words that carry no topic signal.
///
/// Instruction verbs ("define", "explain") and question words ("what") are
/// deliberately kept: they distinguish "define X" from "derive X".
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "from", "that", "this", "these",
    "those", "its", "into", "onto", "their", "them", "then", "than", "there", "has", "have",
    "had", "been", "being", "can", "could", "not", "but", "also", "such", "each", "any",
    "all", "our", "your", "you", "his", "her", "she", "him", "they", "which", "will",
    "would", "shall", "should", "may", "might", "must", "does", "did", "about", "upon",
    "via", "per", "etc",
];

/// Suffixes removed by [`stem`], longest-first within each family.
const SUFFIXES: &[&str] = &[
    "izations", "ization", "ational", "ations", "ation", "itions", "ition", "ements",
    "ement", "ments", "ment", "nesses", "ness", "ings", "ing", "ions", "ion", "ies", "ied",
    "ed", "es", "ly", "e", "y", "s",
];

const MIN_TOKEN_CHARS: usize = 3;

/// Extract the keyword set of already-normalized text.
///
/// Splits on non-alphanumeric boundaries, drops tokens shorter than three
/// characters, stop words and purely numeric tokens, then stems what is
/// left. Degenerate input yields an empty set.
pub fn extract_keywords(normalized: &str) -> HashSet<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !t.chars().all(|c| c.is_numeric()))
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .map(|t| stem(&t))
        .collect()
}

/// Light suffix-stripping stemmer.
///
/// Conflates common inflections ("define", "defined", "definition") so they
/// count as one keyword. Never leaves a stem shorter than three characters.
pub fn stem(word: &str) -> String {
    for suffix in SUFFIXES {
        if !word.ends_with(suffix) {
            continue;
        }
        if *suffix == "s" && word.ends_with("ss") {
            continue;
        }
        let stem = &word[..word.len() - suffix.len()];
        if stem.chars().count() >= MIN_TOKEN_CHARS {
            return stem.to_string();
        }
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_filters_short_and_stop_words() {
        assert_eq!(extract_keywords("what is entropy"), set(&["what", "entrop"]));
        assert_eq!(extract_keywords("define entropy"), set(&["defin", "entrop"]));
    }

    #[test]
    fn test_discards_numeric_tokens() {
        assert_eq!(extract_keywords("list 500 uses 3rd law"), set(&["list", "use", "3rd", "law"]));
    }

    #[test]
    fn test_degenerate_input_is_empty() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("is a of to").is_empty());
        assert!(extract_keywords("123 4567").is_empty());
    }

    #[test]
    fn test_inflections_conflate() {
        assert_eq!(stem("define"), "defin");
        assert_eq!(stem("defined"), "defin");
        assert_eq!(stem("definition"), "defin");
        assert_eq!(stem("theories"), "theor");
        assert_eq!(stem("theory"), "theor");
        assert_eq!(stem("processes"), "process");
        assert_eq!(stem("process"), "process");
    }

    #[test]
    fn test_stem_keeps_minimum_length() {
        assert_eq!(stem("gas"), "gas");
        assert_eq!(stem("use"), "use");
        assert_eq!(stem("uses"), "use");
    }

    #[test]
    fn test_scenario_pair_shares_all_keywords() {
        let a = extract_keywords("define entropy concept");
        let b = extract_keywords("entropy concept definition");
        assert_eq!(a, b);
    }
}
