//! DeLFT text classification client
//!
//! Posts `{"model": ..., "texts": [...]}` to a classification endpoint and
//! reads back the DeLFT output format:
//!
//! ```json
//! {"model": "dataseer-binary", "software": "DeLFT", "date": "...",
//!  "classifications": [{"text": "...", "dataset": 0.97, "no_dataset": 0.03}]}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use dataseer_core::{BatchClassifier, ClassScores, DataseerError, Result};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    texts: &'a [String],
}

/// HTTP client for one DeLFT classification model
pub struct DelftClassifier {
    client: Client,
    url: String,
    model: String,
}

impl DelftClassifier {
    /// Create a client for `model` served at `url`
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
        }
    }

    /// Share an existing HTTP client (connection pool)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn error(&self, message: impl Into<String>) -> DataseerError {
        DataseerError::ClassifierError {
            model: self.model.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl BatchClassifier for DelftClassifier {
    async fn classify(&self, texts: &[String]) -> Result<Vec<ClassScores>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = ClassifyRequest {
            model: &self.model,
            texts,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    DataseerError::ServiceUnavailable(format!("{}: {e}", self.url))
                } else {
                    self.error(format!("Request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {status}: {error_text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {e}")))?;

        let scores = parse_classifications(&body).map_err(|e| self.error(e))?;
        debug!(
            model = %self.model,
            texts = texts.len(),
            classifications = scores.len(),
            "DeLFT batch classified"
        );
        Ok(scores)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Read the per-text label probabilities of a DeLFT response
///
/// Every numeric field of a classification entry is a label score; `text`
/// and any other non-numeric field are ignored. A response without a
/// `classifications` array is an error, an empty array is not.
pub fn parse_classifications(body: &Value) -> std::result::Result<Vec<ClassScores>, String> {
    let entries = body
        .get("classifications")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no classifications array".to_string())?;

    Ok(entries
        .iter()
        .map(|entry| {
            entry
                .as_object()
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|(label, value)| value.as_f64().map(|p| (label.clone(), p)))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect())
}
