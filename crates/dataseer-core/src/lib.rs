//! DataSeer Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the DataSeer pipeline:
//! - Document arena (sections, paragraphs, sentences) with stable ids
//! - Per-sentence classification results and the acceptance rule
//! - Dataset / DataInstance annotation tables
//! - Capability traits for the external model services
//! - Common error types
//! - Configuration management

pub mod config;
pub mod document;
pub mod services;

pub use config::{AppConfig, ConfigError, LoggingConfig, PipelineConfig, ServiceConfig};
pub use document::{
    DataInstance, DataInstanceId, Dataset, DatasetId, Document, Paragraph, ParagraphId, Section,
    SectionChild, SectionId, Sentence, SentenceId,
};
pub use services::{BatchClassifier, ClassScores, SentenceDetector, SequenceLabeler};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Default probability above which a dataset-bearing sentence is annotated
pub const ACCEPT_THRESHOLD: f64 = 0.9;

/// Marker placed on every section containing an accepted mention
pub const DATASEER_SUBTYPE: &str = "dataseer";

/// Score keys that are never candidate dataset types
pub const RESERVED_SCORE_KEYS: &[&str] = &["has_dataset", "no_dataset", "reuse", "no_reuse"];

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for DataSeer operations
#[derive(Error, Debug)]
pub enum DataseerError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Classifier error ({model}): {message}")]
    ClassifierError { model: String, message: String },

    #[error("Sequence labeler error: {0}")]
    LabelerError(String),

    #[error("Service {service} timed out after {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DataseerError>;

// ============================================================================
// Classification Results
// ============================================================================

/// Merged outcome of the classification cascade for one sentence
///
/// Unset probabilities mean the corresponding stage produced no usable
/// evidence; such a sentence is treated as carrying no dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Stage-1 `dataset` probability, stored under its own name so it never
    /// collides with a `"Dataset"` label of the type taxonomy
    pub has_dataset: Option<f64>,

    /// Stage-1 `no_dataset` probability
    pub no_dataset: Option<f64>,

    /// Stage-2 dataset type probabilities
    pub type_scores: BTreeMap<String, f64>,

    /// Stage-3 reuse decision (None when the stage did not run)
    pub reuse: Option<bool>,
}

impl ClassificationResult {
    /// Whether stage 1 favoured the dataset class
    pub fn is_dataset_bearing(&self) -> bool {
        match (self.has_dataset, self.no_dataset) {
            (Some(has), Some(no)) => has > no,
            _ => false,
        }
    }

    /// Acceptance rule: dataset-bearing and strictly above the threshold
    pub fn is_accepted(&self, threshold: f64) -> bool {
        self.is_dataset_bearing() && self.has_dataset.map(|p| p > threshold).unwrap_or(false)
    }

    /// Highest-scoring non-reserved type label
    pub fn best_type(&self) -> Option<(&str, f64)> {
        self.type_scores
            .iter()
            .filter(|(label, _)| !RESERVED_SCORE_KEYS.contains(&label.as_str()))
            .fold(None, |best: Option<(&str, f64)>, (label, score)| match best {
                Some((_, best_score)) if best_score >= *score => best,
                _ => Some((label.as_str(), *score)),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn result(has: f64, no: f64) -> ClassificationResult {
        ClassificationResult {
            has_dataset: Some(has),
            no_dataset: Some(no),
            ..Default::default()
        }
    }

    #[test]
    fn test_confident_sentence_is_accepted() {
        assert!(result(0.95, 0.05).is_accepted(ACCEPT_THRESHOLD));
    }

    #[test]
    fn test_below_threshold_never_accepted() {
        let mut r = result(0.85, 0.15);
        r.type_scores.insert("Generic data".to_string(), 0.99);
        assert!(r.is_dataset_bearing());
        assert!(!r.is_accepted(ACCEPT_THRESHOLD));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!result(0.9, 0.1).is_accepted(ACCEPT_THRESHOLD));
    }

    #[test]
    fn test_unset_scores_mean_no_dataset() {
        let r = ClassificationResult::default();
        assert!(!r.is_dataset_bearing());
        assert!(!r.is_accepted(0.0));

        let partial = ClassificationResult {
            has_dataset: Some(0.99),
            ..Default::default()
        };
        assert!(!partial.is_accepted(ACCEPT_THRESHOLD));
    }

    #[test]
    fn test_best_type_skips_reserved_keys() {
        let mut r = result(0.97, 0.03);
        r.type_scores.insert("no_dataset".to_string(), 0.95);
        r.type_scores.insert("Generic data".to_string(), 0.8);
        r.type_scores.insert("Tabular data".to_string(), 0.1);

        assert_eq!(r.best_type(), Some(("Generic data", 0.8)));
    }

    #[test]
    fn test_best_type_empty() {
        assert_eq!(result(0.97, 0.03).best_type(), None);
    }

    #[test]
    fn test_error_display() {
        let err = DataseerError::Timeout {
            service: "dataseer-binary".to_string(),
            timeout_ms: 500,
        };
        assert_eq!(
            err.to_string(),
            "Service dataseer-binary timed out after 500ms"
        );
    }
}
