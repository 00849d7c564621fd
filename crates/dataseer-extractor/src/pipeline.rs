//! End-to-end annotation pipeline
//!
//! segment → classify (one cascade call per paragraph) → relevance over the
//! whole segment list → assemble. Each document is processed on the calling
//! task; the only shared state is the service handles inside the cascade and
//! the relevance filter.

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use dataseer_core::{
    Document, ParagraphId, PipelineConfig, Result, SentenceDetector, ACCEPT_THRESHOLD,
};
use dataseer_parser::TeiParser;

use crate::assembler::{collect_segments, AnnotationAssembler};
use crate::cascade::ClassificationCascade;
use crate::features::{FeatureStream, RelevanceFeatureBuilder};
use crate::lexicon::is_materials_and_methods;
use crate::relevance::SectionRelevanceFilter;
use crate::segmenter::{RuleBasedSentenceDetector, SentenceSegmenter};

/// Counters of one processed document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub sections: usize,
    pub sentences: usize,
    /// Sentences passing the acceptance rule, before relevance filtering
    pub candidates: usize,
    pub relevant_sections: usize,
    pub mentions: usize,
    pub methods_sections: usize,
}

impl PipelineSummary {
    pub fn of(doc: &Document, candidates: usize) -> Self {
        Self {
            sections: doc.sections().len(),
            sentences: doc.sentences().len(),
            candidates,
            relevant_sections: doc.sections().iter().filter(|s| s.is_relevant()).count(),
            mentions: doc.data_instances().len(),
            methods_sections: doc
                .sections()
                .iter()
                .filter_map(|s| s.heading.as_deref())
                .filter(|h| is_materials_and_methods(h))
                .count(),
        }
    }
}

/// Dataset-mention detection pipeline
pub struct DatasetPipeline<D: SentenceDetector = RuleBasedSentenceDetector> {
    segmenter: SentenceSegmenter<D>,
    cascade: ClassificationCascade,
    relevance: SectionRelevanceFilter,
    assembler: AnnotationAssembler,
    threshold: f64,
}

impl DatasetPipeline<RuleBasedSentenceDetector> {
    pub fn new(cascade: ClassificationCascade, relevance: SectionRelevanceFilter) -> Self {
        Self::with_segmenter(SentenceSegmenter::new(), cascade, relevance)
    }

    /// Pipeline with threshold and binning taken from the configuration
    pub fn from_config(
        config: &PipelineConfig,
        cascade: ClassificationCascade,
        relevance: SectionRelevanceFilter,
    ) -> Self {
        let builder =
            RelevanceFeatureBuilder::new().with_bins(config.position_bins, config.length_bins);
        Self::new(cascade, relevance.with_builder(builder)).with_threshold(config.accept_threshold)
    }
}

impl<D: SentenceDetector> DatasetPipeline<D> {
    pub fn with_segmenter(
        segmenter: SentenceSegmenter<D>,
        cascade: ClassificationCascade,
        relevance: SectionRelevanceFilter,
    ) -> Self {
        Self {
            segmenter,
            cascade,
            relevance,
            assembler: AnnotationAssembler::new(),
            threshold: ACCEPT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self.assembler = self.assembler.with_threshold(threshold);
        self
    }

    pub fn cascade(&self) -> &ClassificationCascade {
        &self.cascade
    }

    /// Annotate a document
    pub async fn process(&self, doc: Document) -> Result<Document> {
        self.process_with_summary(doc).await.map(|(doc, _)| doc)
    }

    /// Annotate a document and report what was found
    pub async fn process_with_summary(
        &self,
        mut doc: Document,
    ) -> Result<(Document, PipelineSummary)> {
        let candidates = self.classify_document(&mut doc).await?;

        let segments = collect_segments(&doc);
        let decisions = self.relevance.filter(&segments).await;
        let doc = self.assembler.assemble(doc, &segments, &decisions)?;

        let summary = PipelineSummary::of(&doc, candidates);
        info!(
            document = %doc.id,
            sentences = summary.sentences,
            candidates = summary.candidates,
            relevant_sections = summary.relevant_sections,
            mentions = summary.mentions,
            methods_sections = summary.methods_sections,
            "document annotated"
        );
        Ok((doc, summary))
    }

    /// Annotate several documents, at most `concurrency` in flight
    ///
    /// Results come back in input order. Service gates still bound the
    /// number of concurrent model calls.
    pub async fn process_many(
        &self,
        docs: Vec<Document>,
        concurrency: usize,
    ) -> Vec<Result<Document>> {
        stream::iter(docs)
            .map(|doc| self.process(doc))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Read a TEI string and annotate it
    pub async fn process_tei(&self, xml: &str) -> Result<Document> {
        let doc = TeiParser::new().parse_str(xml)?;
        self.process(doc).await
    }

    /// Segment and classify, then return the relevance model input
    pub async fn features(&self, mut doc: Document) -> Result<FeatureStream> {
        self.classify_document(&mut doc).await?;
        let segments = collect_segments(&doc);
        Ok(self.relevance.builder().build(&segments))
    }

    /// Segment unsegmented paragraphs and classify every sentence, one
    /// cascade call per paragraph
    ///
    /// Stores results on the sentences and the accepted count on each
    /// paragraph. Returns the total accepted count.
    pub async fn classify_document(&self, doc: &mut Document) -> Result<usize> {
        self.segmenter.segment_document(doc)?;

        let paragraph_ids: Vec<ParagraphId> = doc.paragraphs().iter().map(|p| p.id).collect();
        let mut accepted_total = 0;

        for pid in paragraph_ids {
            let (sentence_ids, texts) = match doc.paragraph(pid) {
                Some(paragraph) if !paragraph.sentences.is_empty() => {
                    let texts: Vec<String> = paragraph
                        .sentences
                        .iter()
                        .filter_map(|s| doc.sentence(*s))
                        .map(|s| s.text.clone())
                        .collect();
                    (paragraph.sentences.clone(), texts)
                }
                _ => continue,
            };

            let results = self.cascade.classify(&texts).await;
            let mut accepted = 0;
            for (sid, result) in sentence_ids.into_iter().zip(results) {
                if result.is_accepted(self.threshold) {
                    accepted += 1;
                }
                if let Some(sentence) = doc.sentence_mut(sid) {
                    sentence.classification = Some(result);
                }
            }

            if let Some(paragraph) = doc.paragraph_mut(pid) {
                paragraph.dataset_evidence = accepted;
            }
            debug!(paragraph = pid.0, sentences = texts.len(), accepted, "paragraph classified");
            accepted_total += accepted;
        }

        Ok(accepted_total)
    }
}
