//! Segment-level feature vectors for the section relevance model
//!
//! One line per segment (heading or paragraph), single-space separated:
//!
//! ```text
//! tok1 tok2 tok3 lower(tok1) kind has_dataset position_bucket length_bucket
//! ```

use serde::{Deserialize, Serialize};

use dataseer_core::{ParagraphId, SectionId};

use crate::lexicon::is_stopword;
use crate::tokenizer::content_tokens;

/// Default number of bins for the relative document position
pub const POSITION_BINS: usize = 12;

/// Default number of bins for the relative segment length
pub const LENGTH_BINS: usize = 12;

/// Kind of textual unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Heading,
    Paragraph,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One heading or paragraph in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Section the segment belongs to
    pub section: SectionId,

    /// Source paragraph, None for headings
    pub paragraph: Option<ParagraphId>,

    pub kind: SegmentKind,

    /// Plain text
    pub text: String,

    /// Sentences locally accepted as dataset-bearing (always 0 for headings)
    pub dataset_count: usize,
}

impl Segment {
    pub fn heading(section: SectionId, text: impl Into<String>) -> Self {
        Self {
            section,
            paragraph: None,
            kind: SegmentKind::Heading,
            text: text.into(),
            dataset_count: 0,
        }
    }

    pub fn paragraph(
        section: SectionId,
        paragraph: ParagraphId,
        text: impl Into<String>,
        dataset_count: usize,
    ) -> Self {
        Self {
            section,
            paragraph: Some(paragraph),
            kind: SegmentKind::Paragraph,
            text: text.into(),
            dataset_count,
        }
    }
}

/// Discretize `pos` out of `total` into `bins` buckets
///
/// Positions at or past the end map to `bins`, non-positive ones to 0.
pub fn linear_scaling(pos: usize, total: usize, bins: usize) -> usize {
    if pos >= total {
        return bins;
    }
    if pos == 0 {
        return 0;
    }
    (pos as f64 / total as f64 * bins as f64) as usize
}

/// Feature lines plus the segment each line was built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureStream {
    /// Newline-terminated feature lines
    pub text: String,

    /// `line_index[i]` is the segment index of line `i`
    pub line_index: Vec<usize>,
}

impl FeatureStream {
    pub fn is_empty(&self) -> bool {
        self.line_index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.line_index.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Builds the relevance model input from an ordered segment list
#[derive(Debug, Clone)]
pub struct RelevanceFeatureBuilder {
    position_bins: usize,
    length_bins: usize,
}

impl RelevanceFeatureBuilder {
    pub fn new() -> Self {
        Self {
            position_bins: POSITION_BINS,
            length_bins: LENGTH_BINS,
        }
    }

    pub fn with_bins(mut self, position_bins: usize, length_bins: usize) -> Self {
        self.position_bins = position_bins.max(1);
        self.length_bins = length_bins.max(1);
        self
    }

    /// Build one feature line per segment that has at least one usable token
    pub fn build(&self, segments: &[Segment]) -> FeatureStream {
        let max_length = segments
            .iter()
            .map(|s| s.text.chars().count())
            .max()
            .unwrap_or(0);

        let mut stream = FeatureStream::default();
        for (idx, segment) in segments.iter().enumerate() {
            let Some(line) = self.feature_line(segment, idx, segments.len(), max_length) else {
                continue;
            };
            stream.text.push_str(&line);
            stream.text.push('\n');
            stream.line_index.push(idx);
        }
        stream
    }

    fn feature_line(
        &self,
        segment: &Segment,
        position: usize,
        total: usize,
        max_length: usize,
    ) -> Option<String> {
        let tokens: Vec<&str> = content_tokens(&segment.text)
            .flat_map(str::split_whitespace)
            .filter(|t| !is_stopword(t))
            .take(3)
            .collect();

        let first = *tokens.first()?;
        let second = tokens.get(1).copied().unwrap_or(first);
        let third = tokens.get(2).copied().unwrap_or(first);

        let has_dataset = u8::from(segment.dataset_count > 0);
        let position_bucket = linear_scaling(position, total, self.position_bins);
        let length_bucket =
            linear_scaling(segment.text.chars().count(), max_length, self.length_bins);

        Some(format!(
            "{first} {second} {third} {} {} {has_dataset} {position_bucket} {length_bucket}",
            first.to_lowercase(),
            segment.kind,
        ))
    }
}

impl Default for RelevanceFeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
