//! Lexical resources
//!
//! Embedded English stopword list and section-heading patterns.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static STOPWORDS_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("resources/stopwords_en.txt")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
});

static MATERIALS_AND_METHODS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)material(s?)\s*(and|&)\s*method").expect("valid materials-and-methods pattern")
});

/// Shortest heading that can name a "Materials and Methods" section
const MIN_METHODS_HEADING_LEN: usize = 15;

/// Whether the word is an English stopword (case-insensitive)
pub fn is_stopword(word: &str) -> bool {
    let word = word.trim();
    if word.is_empty() {
        return false;
    }
    STOPWORDS_EN.contains(word) || STOPWORDS_EN.contains(word.to_lowercase().as_str())
}

/// Whether a heading introduces a "Materials and Methods" section
pub fn is_materials_and_methods(heading: &str) -> bool {
    heading.chars().count() >= MIN_METHODS_HEADING_LEN && MATERIALS_AND_METHODS.is_match(heading)
}
