//! Section relevance filter
//!
//! Runs the sequence-labeling model over the whole document's segment list
//! and maps each output label to a boolean. Segments that produced no
//! feature line, or whose labels could not be obtained, are not relevant.

use std::sync::Arc;

use tracing::{debug, warn};

use dataseer_core::SequenceLabeler;

use crate::features::{FeatureStream, RelevanceFeatureBuilder, Segment};

/// Label suffix marking a segment as not relevant
pub const NEGATIVE_LABEL_SUFFIX: &str = "no_dataset";

/// Decides which segments may contribute final annotations
#[derive(Clone)]
pub struct SectionRelevanceFilter {
    labeler: Arc<dyn SequenceLabeler>,
    builder: RelevanceFeatureBuilder,
}

impl SectionRelevanceFilter {
    pub fn new(labeler: Arc<dyn SequenceLabeler>) -> Self {
        Self {
            labeler,
            builder: RelevanceFeatureBuilder::new(),
        }
    }

    pub fn with_builder(mut self, builder: RelevanceFeatureBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn builder(&self) -> &RelevanceFeatureBuilder {
        &self.builder
    }

    /// One decision per input segment, same order
    pub async fn filter(&self, segments: &[Segment]) -> Vec<bool> {
        let stream = self.builder.build(segments);
        self.decide(segments.len(), &stream).await
    }

    async fn decide(&self, segment_count: usize, stream: &FeatureStream) -> Vec<bool> {
        let mut decisions = vec![false; segment_count];
        if stream.is_empty() {
            return decisions;
        }

        let lines = match self.labeler.label(&stream.text).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(
                    model = self.labeler.name(),
                    error = %e,
                    "relevance labeling failed, no section is relevant"
                );
                return decisions;
            }
        };

        let labels = parse_labels(&lines);
        if labels.len() != stream.len() {
            warn!(
                model = self.labeler.name(),
                expected = stream.len(),
                received = labels.len(),
                "relevance labeler returned a mis-sized answer, no section is relevant"
            );
            return decisions;
        }

        for (&segment, relevant) in stream.line_index.iter().zip(labels) {
            decisions[segment] = relevant;
        }

        debug!(
            segments = segment_count,
            relevant = decisions.iter().filter(|d| **d).count(),
            "relevance decided"
        );
        decisions
    }
}

impl std::fmt::Debug for SectionRelevanceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionRelevanceFilter")
            .field("labeler", &self.labeler.name())
            .field("builder", &self.builder)
            .finish()
    }
}

/// Parse labeler output, one boolean per non-blank line
///
/// The label is the last tab-separated field, or the last space-separated
/// one when the line has no tab. Labels ending in `no_dataset` (ignoring
/// `<` `>`) are negative, anything else is positive.
pub fn parse_labels<S: AsRef<str>>(lines: &[S]) -> Vec<bool> {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .map(|line| {
            let label = if line.contains('\t') {
                line.rsplit('\t').next()
            } else {
                line.split_whitespace().next_back()
            }
            .unwrap_or("")
            .trim()
            .trim_matches(|c: char| c == '<' || c == '>');
            !label.ends_with(NEGATIVE_LABEL_SUFFIX)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataseer_core::{DataseerError, ParagraphId, Result, SectionId};
    use std::sync::Mutex;

    /// Labels every line by a fixed rule, recording the input
    struct KeywordLabeler {
        keyword: &'static str,
        seen: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl SequenceLabeler for KeywordLabeler {
        async fn label(&self, features: &str) -> Result<Vec<String>> {
            *self.seen.lock().unwrap() = Some(features.to_string());
            Ok(features
                .lines()
                .map(|l| {
                    let label = if l.contains(self.keyword) { "<dataset>" } else { "<no_dataset>" };
                    format!("{l}\t{label}")
                })
                .collect())
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    struct BrokenLabeler;

    #[async_trait::async_trait]
    impl SequenceLabeler for BrokenLabeler {
        async fn label(&self, _features: &str) -> Result<Vec<String>> {
            Err(DataseerError::LabelerError("exit status 1".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn segments() -> Vec<Segment> {
        vec![
            Segment::heading(SectionId(0), "Methods"),
            Segment::paragraph(SectionId(0), ParagraphId(0), "(...)", 0),
            Segment::paragraph(SectionId(0), ParagraphId(1), "Iris measurements", 1),
        ]
    }

    #[test]
    fn test_parse_labels() {
        let lines = vec![
            "Iris Iris Iris iris paragraph 1 3 5\t<dataset>",
            "",
            "A B C a heading 0 0 1 I-<no_dataset>",
            "x x x x paragraph 0 1 1\tno_dataset",
        ];
        assert_eq!(parse_labels(&lines), vec![true, false, false]);
    }

    #[test]
    fn test_parse_labels_empty() {
        let lines: Vec<String> = Vec::new();
        assert!(parse_labels(&lines).is_empty());
    }

    #[tokio::test]
    async fn test_filter_maps_lines_back_to_segments() {
        let labeler = Arc::new(KeywordLabeler {
            keyword: "Iris",
            seen: Mutex::new(None),
        });
        let filter = SectionRelevanceFilter::new(labeler.clone());

        let decisions = filter.filter(&segments()).await;
        assert_eq!(decisions, vec![false, false, true]);

        // the token-less paragraph was never sent
        let seen = labeler.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_failing_labeler_degrades_to_false() {
        let filter = SectionRelevanceFilter::new(Arc::new(BrokenLabeler));
        assert_eq!(filter.filter(&segments()).await, vec![false; 3]);
    }

    #[tokio::test]
    async fn test_empty_segments() {
        let filter = SectionRelevanceFilter::new(Arc::new(BrokenLabeler));
        assert!(filter.filter(&[]).await.is_empty());
    }
}
