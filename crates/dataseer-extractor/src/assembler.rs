//! Annotation assembly
//!
//! Applies the relevance decisions to the section tree, mints one Dataset
//! and one DataInstance per accepted sentence of a relevant section, links
//! them together and marks the sections that hold mentions.

use tracing::debug;

use dataseer_core::{
    DataInstance, DataInstanceId, Dataset, DatasetId, Document, ParagraphId, Result, SectionChild,
    SectionId, ACCEPT_THRESHOLD, DATASEER_SUBTYPE,
};
use dataseer_parser::{fragment_text, normalize_whitespace};

use crate::features::Segment;

/// Data type used when an accepted sentence has no usable type score
pub const UNKNOWN_DATA_TYPE: &str = "Unknown";

/// Ordered segment list of a document: each section's heading, then its
/// paragraphs and nested sections in reading order
pub fn collect_segments(doc: &Document) -> Vec<Segment> {
    let mut segments = Vec::new();
    for &root in doc.roots() {
        collect_section(doc, root, &mut segments);
    }
    segments
}

fn collect_section(doc: &Document, id: SectionId, segments: &mut Vec<Segment>) {
    let Some(section) = doc.section(id) else {
        return;
    };

    if let Some(heading) = section.heading.as_deref().filter(|h| !h.trim().is_empty()) {
        segments.push(Segment::heading(id, heading));
    }

    for child in &section.children {
        match *child {
            SectionChild::Paragraph(pid) => {
                if let Some(paragraph) = doc.paragraph(pid) {
                    segments.push(Segment::paragraph(
                        id,
                        pid,
                        paragraph_text(doc, pid),
                        paragraph.dataset_evidence,
                    ));
                }
            }
            SectionChild::Section(child_id) => collect_section(doc, child_id, segments),
        }
    }
}

/// Plain text of a paragraph: its sentences when segmented, else its content
fn paragraph_text(doc: &Document, id: ParagraphId) -> String {
    let Some(paragraph) = doc.paragraph(id) else {
        return String::new();
    };

    if paragraph.sentences.is_empty() {
        return fragment_text(&paragraph.content)
            .unwrap_or_else(|| normalize_whitespace(&paragraph.content));
    }

    paragraph
        .sentences
        .iter()
        .filter_map(|s| doc.sentence(*s))
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a `Type:Subtype[:Leaf]` label into type and optional subtype
pub fn split_data_type(label: &str) -> (String, Option<String>) {
    match label.split_once(':') {
        Some((data_type, subtype)) if !subtype.trim().is_empty() => {
            (data_type.trim().to_string(), Some(subtype.trim().to_string()))
        }
        Some((data_type, _)) => (data_type.trim().to_string(), None),
        None => (label.trim().to_string(), None),
    }
}

/// Builds the Dataset / DataInstance tables over a classified document
#[derive(Debug, Clone)]
pub struct AnnotationAssembler {
    threshold: f64,
}

impl AnnotationAssembler {
    pub fn new() -> Self {
        Self {
            threshold: ACCEPT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Assemble the annotation layer
    ///
    /// `relevance[i]` is the decision for `segments[i]`; missing decisions
    /// count as not relevant. Previous tables and markers are discarded.
    pub fn assemble(
        &self,
        mut doc: Document,
        segments: &[Segment],
        relevance: &[bool],
    ) -> Result<Document> {
        doc.clear_annotations();

        let section_ids: Vec<SectionId> = doc.sections().iter().map(|s| s.id).collect();
        for id in &section_ids {
            if let Some(section) = doc.section_mut(*id) {
                section.relevant = Some(false);
            }
        }
        for (segment, _) in segments
            .iter()
            .zip(relevance.iter().chain(std::iter::repeat(&false)))
            .filter(|(_, relevant)| **relevant)
        {
            if let Some(section) = doc.section_mut(segment.section) {
                section.relevant = Some(true);
            }
        }

        let mut datasets = Vec::new();
        let mut instances = Vec::new();

        // segments are in reading order, so ids follow the text
        for segment in segments {
            let Some(pid) = segment.paragraph else { continue };
            let relevant = doc
                .section(segment.section)
                .map(|s| s.is_relevant())
                .unwrap_or(false);
            if !relevant {
                continue;
            }

            let sentence_ids = doc
                .paragraph(pid)
                .map(|p| p.sentences.clone())
                .unwrap_or_default();

            for sid in sentence_ids {
                let Some(classification) = doc
                    .sentence(sid)
                    .and_then(|s| s.classification.as_ref())
                    .filter(|c| c.is_accepted(self.threshold))
                else {
                    continue;
                };

                let (data_type, subtype) = classification
                    .best_type()
                    .map(|(label, _)| split_data_type(label))
                    .unwrap_or_else(|| (UNKNOWN_DATA_TYPE.to_string(), None));
                let certainty = classification.has_dataset.unwrap_or_default();
                let reuse = classification.reuse.unwrap_or(false);

                let dataset_id = DatasetId(datasets.len());
                let instance_id = DataInstanceId(instances.len());
                datasets.push(Dataset {
                    id: dataset_id,
                    data_type,
                    subtype,
                });
                instances.push(DataInstance {
                    id: instance_id,
                    dataset: dataset_id,
                    sentence: sid,
                    certainty,
                    reuse,
                });

                if let Some(sentence) = doc.sentence_mut(sid) {
                    sentence.data_instance = Some(instance_id);
                }
                for ancestor in doc.ancestors(segment.section) {
                    if let Some(section) = doc.section_mut(ancestor) {
                        section.subtype = Some(DATASEER_SUBTYPE.to_string());
                    }
                }
            }
        }

        debug!(
            datasets = datasets.len(),
            relevant_sections = doc.sections().iter().filter(|s| s.is_relevant()).count(),
            "annotations assembled"
        );

        doc.attach_tables(datasets, instances);
        Ok(doc)
    }
}

impl Default for AnnotationAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataseer_core::ClassificationResult;
    use std::collections::BTreeMap;

    fn accepted(score: f64, data_type: &str) -> ClassificationResult {
        let mut type_scores = BTreeMap::new();
        type_scores.insert(data_type.to_string(), 0.8);
        ClassificationResult {
            has_dataset: Some(score),
            no_dataset: Some(1.0 - score),
            type_scores,
            reuse: None,
        }
    }

    /// Intro (no heading), Methods with a nested Data section, Results
    fn sample() -> (Document, [SectionId; 4]) {
        let mut doc = Document::new();
        let intro = doc.add_section(None, None);
        let p = doc.add_paragraph(intro, "Intro.").unwrap();
        doc.add_sentence(p, "Intro.", "Intro.").unwrap();

        let methods = doc.add_section(None, Some("Methods".to_string()));
        let p = doc.add_paragraph(methods, "We sampled.").unwrap();
        doc.add_sentence(p, "We sampled.", "We sampled.").unwrap();

        let data = doc.add_section(Some(methods), Some("Data".to_string()));
        let p = doc.add_paragraph(data, "Iris. Other.").unwrap();
        let iris = doc.add_sentence(p, "Iris.", "Iris.").unwrap();
        doc.add_sentence(p, "Other.", "Other.").unwrap();
        doc.sentence_mut(iris).unwrap().classification =
            Some(accepted(0.97, "Tabular data:Spreadsheet"));

        let results = doc.add_section(None, Some("Results".to_string()));
        let p = doc.add_paragraph(results, "Weak.").unwrap();
        let weak = doc.add_sentence(p, "Weak.", "Weak.").unwrap();
        doc.sentence_mut(weak).unwrap().classification = Some(accepted(0.85, "Generic data"));

        (doc, [intro, methods, data, results])
    }

    #[test]
    fn test_collect_segments_reading_order() {
        let (doc, [intro, methods, data, results]) = sample();
        let segments = collect_segments(&doc);
        let summary: Vec<(SectionId, &str)> = segments
            .iter()
            .map(|s| (s.section, s.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (intro, "Intro."),
                (methods, "Methods"),
                (methods, "We sampled."),
                (data, "Data"),
                (data, "Iris. Other."),
                (results, "Results"),
                (results, "Weak."),
            ]
        );
    }

    #[test]
    fn test_paragraph_text_without_sentences() {
        let mut doc = Document::new();
        let s = doc.add_section(None, None);
        doc.add_paragraph(s, "See <ref>Fig.\n 1</ref> &amp; more")
            .unwrap();
        assert_eq!(collect_segments(&doc)[0].text, "See Fig. 1 & more");
    }

    #[test]
    fn test_assemble_marks_relevant_mentions() {
        let (doc, [intro, methods, data, results]) = sample();
        let segments = collect_segments(&doc);
        // only the Data paragraph and the Results paragraph are relevant
        let relevance = vec![false, false, false, false, true, false, true];

        let doc = AnnotationAssembler::new()
            .assemble(doc, &segments, &relevance)
            .unwrap();

        assert_eq!(doc.datasets().len(), 1);
        assert_eq!(doc.data_instances().len(), 1);
        let dataset = &doc.datasets()[0];
        assert_eq!(dataset.data_type, "Tabular data");
        assert_eq!(dataset.subtype.as_deref(), Some("Spreadsheet"));

        let instance = &doc.data_instances()[0];
        assert_eq!(instance.certainty, 0.97);
        assert!(!instance.reuse);
        assert_eq!(doc.sentence(instance.sentence).unwrap().text, "Iris.");

        assert_eq!(doc.section(data).unwrap().subtype.as_deref(), Some("dataseer"));
        assert_eq!(doc.section(methods).unwrap().subtype.as_deref(), Some("dataseer"));
        assert_eq!(doc.section(intro).unwrap().subtype, None);
        // relevant but below the threshold
        assert!(doc.section(results).unwrap().is_relevant());
        assert_eq!(doc.section(results).unwrap().subtype, None);
        // relevance is not inherited from children
        assert!(!doc.section(methods).unwrap().is_relevant());

        doc.validate_references().unwrap();
    }

    #[test]
    fn test_irrelevant_section_contributes_nothing() {
        let (doc, _) = sample();
        let segments = collect_segments(&doc);
        let doc = AnnotationAssembler::new()
            .assemble(doc, &segments, &[])
            .unwrap();

        assert!(doc.datasets().is_empty());
        assert!(doc.sections().iter().all(|s| s.subtype.is_none()));
        assert!(doc.sentences().iter().all(|s| s.data_instance.is_none()));
    }

    #[test]
    fn test_reassembly_resets_previous_tables() {
        let (doc, _) = sample();
        let segments = collect_segments(&doc);
        let assembler = AnnotationAssembler::new();

        let doc = assembler
            .assemble(doc, &segments, &vec![true; segments.len()])
            .unwrap();
        assert_eq!(doc.datasets().len(), 1);

        let doc = assembler.assemble(doc, &segments, &[]).unwrap();
        assert!(doc.datasets().is_empty());
        assert!(doc.sections().iter().all(|s| s.subtype.is_none()));
        doc.validate_references().unwrap();
    }

    #[test]
    fn test_missing_type_scores() {
        let mut doc = Document::new();
        let s = doc.add_section(None, Some("Data".to_string()));
        let p = doc.add_paragraph(s, "X.").unwrap();
        let x = doc.add_sentence(p, "X.", "X.").unwrap();
        doc.sentence_mut(x).unwrap().classification = Some(ClassificationResult {
            has_dataset: Some(0.95),
            no_dataset: Some(0.05),
            type_scores: BTreeMap::new(),
            reuse: Some(true),
        });

        let segments = collect_segments(&doc);
        let doc = AnnotationAssembler::new()
            .assemble(doc, &segments, &[true, true])
            .unwrap();
        assert_eq!(doc.datasets()[0].data_type, UNKNOWN_DATA_TYPE);
        assert!(doc.data_instances()[0].reuse);
    }

    #[test]
    fn test_split_data_type() {
        assert_eq!(
            split_data_type("Sequence data:DNA:Genome"),
            ("Sequence data".to_string(), Some("DNA:Genome".to_string()))
        );
        assert_eq!(split_data_type("Generic data"), ("Generic data".to_string(), None));
        assert_eq!(split_data_type("Image:"), ("Image".to_string(), None));
    }
}
