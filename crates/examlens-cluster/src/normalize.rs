//! Canonical comparison form for raw question text.

use std::sync::LazyLock;

use regex::Regex;

/// Leading question label: `q1.`, `Q 2a)`, `question 3:`.
static QUESTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:question|q)\s*\d+[a-z]?\s*[:.)\-]*\s*").expect("valid label regex")
});

/// One or more trailing mark annotations: `(5 marks)`, `(1 mark)`, `[10]`.
///
/// Runs after year stripping, so brackets emptied by it (`(2019)`) may
/// trail the annotation.
static TRAILING_MARKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\s*(?:\(\s*\d+\s*marks?\s*\)|\[\s*\d+\s*(?:marks?)?\s*\]))+[\s.,;:()\[\]]*$")
        .expect("valid marks regex")
});

/// Standalone four-digit years between 1900 and 2099.
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Runs of anything that is not a letter or digit.
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid separator regex"));

/// Normalize raw question text for comparison.
///
/// Lower-cases, drops a leading question label, standalone years and then
/// trailing mark annotations, and finally collapses whitespace and punctuation to single
/// spaces. Total and deterministic; returns an empty string when nothing
/// comparable is left.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.to_lowercase();
    let text = QUESTION_LABEL.replace(&text, "");
    let text = YEAR.replace_all(&text, " ");
    let text = TRAILING_MARKS.replace(&text, "");
    let text = SEPARATORS.replace_all(&text, " ");
    text.trim().to_string()
}
