//! Sentence segmentation under markup constraints
//!
//! Paragraph content is serialized markup, so a boundary proposed by the
//! detector can fall inside an inline element (`<ref>Fig. 2</ref>`). Every
//! candidate is wrapped in a synthetic `<s>` root and parsed; pieces that do
//! not parse are held back and merged with the following candidates until
//! the accumulated markup is well-formed again.

use std::collections::HashSet;

use tracing::debug;

use dataseer_core::{Document, ParagraphId, Result, SentenceDetector};
use dataseer_parser::{fragment_text, is_well_formed, normalize_whitespace};

// ============================================================================
// Rule-based boundary detection
// ============================================================================

/// Abbreviations whose trailing period does not end a sentence
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "al", "approx", "ca", "cf", "dr", "e.g", "eq", "eqs", "fig", "figs", "i.e", "mr", "mrs", "ms",
    "no", "nos", "pp", "prof", "ref", "refs", "resp", "sect", "sp", "spp", "st", "suppl", "tab",
    "var", "viz", "vol", "vs",
];

/// Sentence-boundary detector driven by terminal punctuation
///
/// A boundary is proposed after `.`, `!` or `?` (plus any closing quotes or
/// brackets) when whitespace follows and the next word starts with an
/// uppercase letter, a digit or an opening bracket, quote or tag. Periods
/// after known abbreviations and single-letter initials are skipped.
#[derive(Debug, Clone)]
pub struct RuleBasedSentenceDetector {
    abbreviations: HashSet<String>,
}

impl RuleBasedSentenceDetector {
    pub fn new() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Add abbreviations (without the trailing period, case-insensitive)
    pub fn with_abbreviations<I, S>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.abbreviations.extend(
            abbreviations
                .into_iter()
                .map(|a| a.as_ref().trim_end_matches('.').to_lowercase()),
        );
        self
    }

    /// Whether the word right before a period is an abbreviation or an initial
    fn ends_with_abbreviation(&self, prefix: &str) -> bool {
        let word = prefix
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_start_matches(|c: char| matches!(c, '(' | '[' | '"' | '“' | '‘' | '>'));

        let mut chars = word.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return c.is_uppercase();
        }
        !word.is_empty() && self.abbreviations.contains(&word.to_lowercase())
    }
}

impl Default for RuleBasedSentenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceDetector for RuleBasedSentenceDetector {
    fn detect(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (idx, c) = chars[i];
            if !matches!(c, '.' | '!' | '?') {
                i += 1;
                continue;
            }

            let mut j = i + 1;
            while j < chars.len() && is_closing(chars[j].1) {
                j += 1;
            }
            if j >= chars.len() || !chars[j].1.is_whitespace() {
                i = j.max(i + 1);
                continue;
            }

            let mut k = j;
            while k < chars.len() && chars[k].1.is_whitespace() {
                k += 1;
            }
            let boundary = k < chars.len()
                && opens_sentence(chars[k].1)
                && !(c == '.' && self.ends_with_abbreviation(&text[..idx]));

            if boundary {
                push_span(text, start, chars[j].0, &mut spans);
                start = chars[k].0;
                i = k;
            } else {
                i = j;
            }
        }
        push_span(text, start, text.len(), &mut spans);

        spans
    }
}

fn is_closing(c: char) -> bool {
    matches!(c, ')' | ']' | '"' | '\'' | '”' | '’')
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '(' | '[' | '"' | '“' | '‘' | '<')
}

/// Push `text[start..end]` without surrounding whitespace, skipping blank spans
fn push_span(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if !trimmed.is_empty() {
        let from = start + leading;
        spans.push((from, from + trimmed.len()));
    }
}

// ============================================================================
// Segmenter
// ============================================================================

/// One well-formed sentence produced by the segmenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedSentence {
    /// Normalized markup, parseable once wrapped in `<s>`
    pub markup: String,

    /// Plain text of the markup
    pub text: String,
}

/// Splits serialized paragraph content into well-formed sentences
pub struct SentenceSegmenter<D: SentenceDetector = RuleBasedSentenceDetector> {
    detector: D,
}

impl SentenceSegmenter<RuleBasedSentenceDetector> {
    /// Segmenter backed by the rule-based detector
    pub fn new() -> Self {
        Self::with_detector(RuleBasedSentenceDetector::new())
    }
}

impl Default for SentenceSegmenter<RuleBasedSentenceDetector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SentenceDetector> SentenceSegmenter<D> {
    pub fn with_detector(detector: D) -> Self {
        Self { detector }
    }

    /// Segment one textual unit
    ///
    /// Never fails: candidates that break markup are merged forward, and an
    /// unbalanced tail left at the end of the input is dropped.
    pub fn segment(&self, content: &str) -> Vec<SegmentedSentence> {
        let mut sentences = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for (start, end) in self.detector.detect(content) {
            let Some(candidate) = content.get(start..end) else {
                debug!(start, end, "detector span outside the input, skipped");
                continue;
            };
            pending.push(candidate);

            let joined = pending.join(" ");
            if !is_well_formed(&joined) {
                continue;
            }
            pending.clear();

            let markup = normalize_whitespace(&joined);
            if markup.is_empty() {
                continue;
            }
            let text = fragment_text(&markup).unwrap_or_else(|| markup.clone());
            sentences.push(SegmentedSentence { markup, text });
        }

        if !pending.is_empty() {
            debug!(
                fragments = pending.len(),
                "dropping unbalanced trailing fragment"
            );
        }

        sentences
    }

    /// Segment every paragraph that has no sentences yet
    ///
    /// Paragraphs that arrived pre-segmented are left untouched. Returns the
    /// number of sentences added.
    pub fn segment_document(&self, doc: &mut Document) -> Result<usize> {
        let pending: Vec<(ParagraphId, String)> = doc
            .paragraphs()
            .iter()
            .filter(|p| p.sentences.is_empty())
            .map(|p| (p.id, p.content.clone()))
            .collect();

        let mut added = 0;
        for (paragraph, content) in pending {
            for sentence in self.segment(&content) {
                doc.add_sentence(paragraph, sentence.markup, sentence.text)?;
                added += 1;
            }
        }

        debug!(sentences = added, "document segmented");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans<'a>(text: &'a str, detector: &RuleBasedSentenceDetector) -> Vec<&'a str> {
        detector
            .detect(text)
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect()
    }

    /// Detector returning fixed spans
    struct FixedDetector(Vec<(usize, usize)>);

    impl SentenceDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Vec<(usize, usize)> {
            self.0.clone()
        }
    }

    #[test]
    fn test_detect_simple_boundaries() {
        let detector = RuleBasedSentenceDetector::new();
        assert_eq!(
            spans("We used data. It was public! Was it? Yes.", &detector),
            vec!["We used data.", "It was public!", "Was it?", "Yes."]
        );
    }

    #[test]
    fn test_detect_skips_abbreviations_and_initials() {
        let detector = RuleBasedSentenceDetector::new();
        assert_eq!(
            spans("As in Smith et al. 2010, see Fig. 2 and J. Doe. Then more.", &detector),
            vec!["As in Smith et al. 2010, see Fig. 2 and J. Doe.", "Then more."]
        );
    }

    #[test]
    fn test_detect_lowercase_continuation() {
        let detector = RuleBasedSentenceDetector::new();
        assert_eq!(spans("Values approx. three units. done", &detector).len(), 1);
    }

    #[test]
    fn test_detect_closing_quote() {
        let detector = RuleBasedSentenceDetector::new();
        assert_eq!(
            spans("He said “done.” Then left.", &detector),
            vec!["He said “done.”", "Then left."]
        );
    }

    #[test]
    fn test_custom_abbreviation() {
        let detector = RuleBasedSentenceDetector::new().with_abbreviations(["Ext."]);
        assert_eq!(spans("See Ext. Data 1.", &detector).len(), 1);
    }

    #[test]
    fn test_segment_merges_broken_markup() {
        let content = r#"Data came from <ref type="figure">Fig. A. Two</ref> repositories. Next one."#;
        // split inside the ref element on purpose
        let first_end = content.find("A.").unwrap() + 2;
        let second_start = first_end + 1;
        let second_end = content.find("repositories.").unwrap() + "repositories.".len();
        let third_start = second_end + 1;
        let segmenter = SentenceSegmenter::with_detector(FixedDetector(vec![
            (0, first_end),
            (second_start, second_end),
            (third_start, content.len()),
        ]));

        let sentences = segmenter.segment(content);
        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0].markup,
            r#"Data came from <ref type="figure">Fig. A. Two</ref> repositories."#
        );
        assert_eq!(sentences[0].text, "Data came from Fig. A. Two repositories.");
        assert_eq!(sentences[1].text, "Next one.");
    }

    #[test]
    fn test_segment_prefixed_inline_markup() {
        let content = r#"We used the GenBank dataset with <formula><mml:math><mml:mi>n</mml:mi></mml:math></formula> reads. It has 10 rows."#;
        let sentences = SentenceSegmenter::new().segment(content);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].markup.contains("<mml:math>"));
        assert_eq!(sentences[0].text, "We used the GenBank dataset with n reads.");
        assert_eq!(sentences[1].text, "It has 10 rows.");
    }

    #[test]
    fn test_segment_drops_unbalanced_tail() {
        let content = "Complete sentence. Broken <ref>tail";
        let segmenter = SentenceSegmenter::with_detector(FixedDetector(vec![(0, 18), (19, 35)]));
        let sentences = segmenter.segment(content);
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].text, "Complete sentence.");
    }

    #[test]
    fn test_segment_normalizes_whitespace() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("  A first\n   line.\nA   second line. ");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["A first line.", "A second line."]);
    }

    #[test]
    fn test_segment_entities() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("R &amp; D data. More.");
        assert_eq!(sentences[0].markup, "R &amp; D data.");
        assert_eq!(sentences[0].text, "R & D data.");
    }

    #[test]
    fn test_segment_empty_and_out_of_range() {
        let segmenter = SentenceSegmenter::new();
        assert!(segmenter.segment("").is_empty());
        assert!(segmenter.segment("   \n ").is_empty());

        let segmenter = SentenceSegmenter::with_detector(FixedDetector(vec![(0, 100)]));
        assert!(segmenter.segment("short").is_empty());
    }

    #[test]
    fn test_segment_document_keeps_presegmented() {
        let mut doc = Document::new();
        let section = doc.add_section(None, None);
        let raw = doc.add_paragraph(section, "One here. Two here.").unwrap();
        let done = doc.add_paragraph(section, "Kept as is. Really.").unwrap();
        doc.add_sentence(done, "Kept as is. Really.", "Kept as is. Really.")
            .unwrap();

        let added = SentenceSegmenter::new().segment_document(&mut doc).unwrap();
        assert_eq!(added, 2);
        assert_eq!(doc.paragraph(raw).unwrap().sentences.len(), 2);
        assert_eq!(doc.paragraph(done).unwrap().sentences.len(), 1);
    }
}
