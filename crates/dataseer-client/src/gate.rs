//! Service access gates
//!
//! Model runtimes are not assumed to be thread-safe. Every handle is wrapped
//! in a gate holding a semaphore with `pool_size` permits and a per-call
//! timeout; callers wait for a permit instead of hitting the model directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::warn;

use dataseer_core::{BatchClassifier, ClassScores, DataseerError, Result, SequenceLabeler};

/// Permit pool plus timeout shared by one service handle
#[derive(Debug, Clone)]
pub struct Gate {
    service: String,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl Gate {
    pub fn new(service: impl Into<String>, pool_size: usize, timeout: Duration) -> Self {
        Self {
            service: service.into(),
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
            timeout,
        }
    }

    /// Run `call` holding a permit, bounded by the timeout
    ///
    /// Time spent waiting for a permit counts against the timeout.
    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let guarded = async {
            let _permit = self.permits.acquire().await.map_err(|_| {
                DataseerError::ServiceUnavailable(format!("{} is shut down", self.service))
            })?;
            call.await
        };

        match tokio::time::timeout(self.timeout, guarded).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(service = %self.service, timeout_ms, "service call timed out");
                Err(DataseerError::Timeout {
                    service: self.service.clone(),
                    timeout_ms,
                })
            }
        }
    }

    /// Refuse all further calls; in-flight calls finish normally
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

// ============================================================================
// Gated handles
// ============================================================================

/// Classifier behind a gate
pub struct GatedClassifier {
    inner: Arc<dyn BatchClassifier>,
    gate: Gate,
}

impl GatedClassifier {
    pub fn new(inner: Arc<dyn BatchClassifier>, pool_size: usize, timeout: Duration) -> Self {
        let gate = Gate::new(inner.name().to_string(), pool_size, timeout);
        Self { inner, gate }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

#[async_trait]
impl BatchClassifier for GatedClassifier {
    async fn classify(&self, texts: &[String]) -> Result<Vec<ClassScores>> {
        self.gate.run(self.inner.classify(texts)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Sequence labeler behind a gate
pub struct GatedLabeler {
    inner: Arc<dyn SequenceLabeler>,
    gate: Gate,
}

impl GatedLabeler {
    pub fn new(inner: Arc<dyn SequenceLabeler>, pool_size: usize, timeout: Duration) -> Self {
        let gate = Gate::new(inner.name().to_string(), pool_size, timeout);
        Self { inner, gate }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

#[async_trait]
impl SequenceLabeler for GatedLabeler {
    async fn label(&self, features: &str) -> Result<Vec<String>> {
        self.gate.run(self.inner.label(features)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
