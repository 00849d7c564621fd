//! Capability traits for the external collaborators
//!
//! The neural classifiers, the CRF tagger and the sentence-boundary detector
//! are opaque services. The pipeline only ever sees these traits, so every
//! stage can run against deterministic stubs.

use std::collections::BTreeMap;

use crate::Result;

/// Per-text class probabilities (label -> probability)
pub type ClassScores = BTreeMap<String, f64>;

/// Trait for batch text classifiers (binary, dataset-type, reuse)
#[async_trait::async_trait]
pub trait BatchClassifier: Send + Sync {
    /// Classify a batch of texts, one score map per text, same order
    async fn classify(&self, texts: &[String]) -> Result<Vec<ClassScores>>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Trait for the sequence-labeling service used by the relevance filter
#[async_trait::async_trait]
pub trait SequenceLabeler: Send + Sync {
    /// Label a feature stream (one vector per line), one output line per input line
    async fn label(&self, features: &str) -> Result<Vec<String>>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Trait for sentence-boundary detectors
pub trait SentenceDetector: Send + Sync {
    /// Candidate sentence spans as `(start, end)` byte offsets, in order
    fn detect(&self, text: &str) -> Vec<(usize, usize)>;
}
