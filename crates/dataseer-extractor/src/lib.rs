//! DataSeer Extractor - Dataset-mention detection pipeline
//!
//! Implements the annotation pipeline over a structured document:
//! - Sentence segmentation that never breaks inline markup
//! - A cascading classifier (binary, data type, reuse) over model services
//! - Section relevance from segment-level features and a sequence labeler
//! - Assembly of the Dataset / DataInstance annotation tables

pub mod assembler;
pub mod cascade;
pub mod features;
pub mod lexicon;
pub mod pipeline;
pub mod relevance;
pub mod segmenter;
pub mod tokenizer;

pub use assembler::{collect_segments, split_data_type, AnnotationAssembler};
pub use cascade::{CascadeReport, ClassificationCascade, SentenceClassification};
pub use features::{linear_scaling, FeatureStream, RelevanceFeatureBuilder, Segment, SegmentKind};
pub use lexicon::{is_materials_and_methods, is_stopword};
pub use pipeline::{DatasetPipeline, PipelineSummary};
pub use relevance::{parse_labels, SectionRelevanceFilter};
pub use segmenter::{RuleBasedSentenceDetector, SegmentedSentence, SentenceSegmenter};
pub use tokenizer::tokenize;
