//! Classification cascade
//!
//! Stage 1 (binary) sees every sentence of the batch. Sentences where
//! `dataset > no_dataset` are cascaded to stage 2 (data type) and, when a
//! reuse model is configured, to stage 3 (reuse). Later-stage outputs are
//! merged back positionally into the originating records.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dataseer_core::{BatchClassifier, ClassScores, ClassificationResult};

/// Positive label of the binary model
pub const DATASET_LABEL: &str = "dataset";
/// Negative label of the binary model
pub const NO_DATASET_LABEL: &str = "no_dataset";
/// Positive label of the reuse model
pub const REUSE_LABEL: &str = "reuse";
/// Negative label of the reuse model
pub const NO_REUSE_LABEL: &str = "no_reuse";

/// Default number of texts sent in one service call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 256;

// ============================================================================
// Cascade
// ============================================================================

/// Multi-stage sentence classifier over opaque model services
#[derive(Clone)]
pub struct ClassificationCascade {
    binary: Arc<dyn BatchClassifier>,
    first_level: Arc<dyn BatchClassifier>,
    reuse: Option<Arc<dyn BatchClassifier>>,
    max_batch_size: usize,
}

impl ClassificationCascade {
    /// Create a cascade from the binary and data-type classifiers
    pub fn new(binary: Arc<dyn BatchClassifier>, first_level: Arc<dyn BatchClassifier>) -> Self {
        Self {
            binary,
            first_level,
            reuse: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Add the reuse stage
    pub fn with_reuse(mut self, reuse: Arc<dyn BatchClassifier>) -> Self {
        self.reuse = Some(reuse);
        self
    }

    /// Set the chunk size for service calls (0 is treated as 1)
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Classify a batch of sentences
    ///
    /// Returns exactly one result per input, in input order. Service
    /// failures leave the affected fields unset; they never drop a record.
    pub async fn classify(&self, sentences: &[String]) -> Vec<ClassificationResult> {
        let mut results = vec![ClassificationResult::default(); sentences.len()];
        if sentences.is_empty() {
            return results;
        }

        // Stage 1: binary
        let binary = self.call_stage(self.binary.as_ref(), sentences).await;
        let mut cascaded: Vec<usize> = Vec::new();
        for (idx, scores) in binary.into_iter().enumerate() {
            let Some(scores) = scores else { continue };
            if let (Some(&yes), Some(&no)) =
                (scores.get(DATASET_LABEL), scores.get(NO_DATASET_LABEL))
            {
                results[idx].has_dataset = Some(yes);
                results[idx].no_dataset = Some(no);
                if yes > no {
                    cascaded.push(idx);
                }
            }
        }

        debug!(
            sentences = sentences.len(),
            cascaded = cascaded.len(),
            "binary stage done"
        );
        if cascaded.is_empty() {
            return results;
        }

        let texts: Vec<String> = cascaded.iter().map(|&i| sentences[i].clone()).collect();

        // Stage 2: data type
        let types = self.call_stage(self.first_level.as_ref(), &texts).await;
        for (&idx, scores) in cascaded.iter().zip(types) {
            if let Some(scores) = scores {
                results[idx].type_scores = scores;
            }
        }

        // Stage 3: reuse
        if let Some(reuse) = &self.reuse {
            let reuse_scores = self.call_stage(reuse.as_ref(), &texts).await;
            for (&idx, scores) in cascaded.iter().zip(reuse_scores) {
                if let Some(scores) = scores {
                    if let (Some(&yes), Some(&no)) =
                        (scores.get(REUSE_LABEL), scores.get(NO_REUSE_LABEL))
                    {
                        results[idx].reuse = Some(yes > no);
                    }
                }
            }
        }

        results
    }

    /// Classify a single sentence
    pub async fn classify_sentence(&self, text: &str) -> ClassificationResult {
        self.classify(&[text.to_string()])
            .await
            .pop()
            .unwrap_or_default()
    }

    /// Classify a batch and wrap the outcome in a JSON-serializable report
    pub async fn report(&self, sentences: &[String]) -> CascadeReport {
        let results = self.classify(sentences).await;
        CascadeReport::new(sentences, &results)
    }

    /// Call one stage over `texts` in chunks of `max_batch_size`
    ///
    /// The output always has one slot per text. A failed or mis-sized chunk
    /// only blanks its own slots.
    async fn call_stage(
        &self,
        classifier: &dyn BatchClassifier,
        texts: &[String],
    ) -> Vec<Option<ClassScores>> {
        let mut out = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.max_batch_size) {
            match classifier.classify(chunk).await {
                Ok(scores) if scores.len() == chunk.len() => {
                    out.extend(
                        scores
                            .into_iter()
                            .map(|s| if s.is_empty() { None } else { Some(s) }),
                    );
                }
                Ok(scores) => {
                    warn!(
                        model = classifier.name(),
                        expected = chunk.len(),
                        received = scores.len(),
                        "classifier returned a mis-sized batch, treating as no evidence"
                    );
                    out.extend(std::iter::repeat_with(|| None).take(chunk.len()));
                }
                Err(e) => {
                    warn!(
                        model = classifier.name(),
                        batch = chunk.len(),
                        error = %e,
                        "classifier call failed, treating as no evidence"
                    );
                    out.extend(std::iter::repeat_with(|| None).take(chunk.len()));
                }
            }
        }

        out
    }
}

impl std::fmt::Debug for ClassificationCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationCascade")
            .field("binary", &self.binary.name())
            .field("first_level", &self.first_level.name())
            .field("reuse", &self.reuse.as_ref().map(|r| r.name().to_string()))
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

// ============================================================================
// Report
// ============================================================================

/// Classification report in the format of the sentence classification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub model: String,
    pub software: String,
    /// ISO-8601 creation time
    pub date: String,
    pub classifications: Vec<SentenceClassification>,
}

/// One entry of a [`CascadeReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceClassification {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_dataset: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse: Option<bool>,

    /// Data-type scores of the second stage
    #[serde(flatten)]
    pub types: BTreeMap<String, f64>,
}

impl CascadeReport {
    pub fn new(texts: &[String], results: &[ClassificationResult]) -> Self {
        let classifications = texts
            .iter()
            .zip(results)
            .map(|(text, result)| SentenceClassification {
                text: text.clone(),
                dataset: result.has_dataset,
                no_dataset: result.no_dataset,
                reuse: result.reuse,
                types: result.type_scores.clone(),
            })
            .collect();

        Self {
            model: "dataseer".to_string(),
            software: "DeLFT".to_string(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            classifications,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
