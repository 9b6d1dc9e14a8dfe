//! Human-readable topic names for clusters.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:question|q)\s*\d+[a-z]?\s*[:.)\-]*\s*").expect("valid label regex")
});

static LEADING_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:briefly\s+)?(?:explain|define|describe|discuss|what\s+(?:is|are)|what|how|why|list|enumerate|state|elaborate|illustrate|classify|compare|differentiate|distinguish|mention|identify|write\s+(?:a\s+)?(?:short\s+)?notes?\s+on)\s+(?:the\s+)?",
    )
    .expect("valid verb regex")
});

static MARKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*\d+\s*marks?\s*\)|\[\s*\d+\s*\]").expect("valid marks regex")
});

const FALLBACK_CHARS: usize = 50;

/// Derive a short topic label from a question's raw text.
///
/// "Q2. Explain the working of a Carnot engine. (5 marks)" becomes
/// "Working of a Carnot Engine".
pub fn topic_name(raw: &str, max_chars: usize) -> String {
    let text = LEADING_LABEL.replace(raw, "");
    let text = LEADING_VERB.replace(&text, "");
    let text = MARKS.replace_all(&text, "");
    let first_sentence = text
        .split(|c: char| c == '.' || c == '?')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("");

    // Whole words only, up to the bound.
    let mut name = String::new();
    let mut name_chars = 0;
    for word in first_sentence.split_whitespace().map(capitalize_long_word) {
        let word_chars = word.chars().count();
        let sep = usize::from(!name.is_empty());
        if name_chars + sep + word_chars > max_chars {
            break;
        }
        if sep == 1 {
            name.push(' ');
        }
        name.push_str(&word);
        name_chars += sep + word_chars;
    }

    if name.is_empty() {
        truncate_chars(raw.trim(), FALLBACK_CHARS.min(max_chars))
    } else {
        name
    }
}

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn capitalize_long_word(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_lowercase();
    }
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}
