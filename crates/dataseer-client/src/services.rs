//! Service registry
//!
//! Holds the gated model handles for the lifetime of the process. Created
//! once with [`Services::init`] and released with [`Services::shutdown`];
//! pipelines receive the handles as trait objects.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use dataseer_core::{BatchClassifier, DataseerError, Result, SequenceLabeler, ServiceConfig};

use crate::delft::DelftClassifier;
use crate::gate::{GatedClassifier, GatedLabeler};
use crate::wapiti::WapitiLabeler;

/// Initialized model services
pub struct Services {
    binary: Arc<GatedClassifier>,
    first_level: Arc<GatedClassifier>,
    reuse: Option<Arc<GatedClassifier>>,
    labeler: Arc<GatedLabeler>,
    max_batch_size: usize,
}

impl Services {
    /// Build clients for every configured model
    ///
    /// Fails when the relevance model file is missing; classifier endpoints
    /// are only contacted on first use.
    pub fn init(config: &ServiceConfig) -> Result<Self> {
        if !config.relevance_model.exists() {
            return Err(DataseerError::ConfigError(format!(
                "relevance model not found: {}",
                config.relevance_model.display()
            )));
        }
        Ok(Self::init_unchecked(config))
    }

    /// Build clients without checking model files
    pub fn init_unchecked(config: &ServiceConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::new();

        let classifier = |url: &str, model: &str| {
            let delft = DelftClassifier::new(url, model).with_client(client.clone());
            Arc::new(GatedClassifier::new(
                Arc::new(delft),
                config.pool_size,
                timeout,
            ))
        };

        let binary = classifier(&config.binary_url, &config.binary_model);
        let first_level = classifier(&config.first_level_url, &config.first_level_model);
        let reuse = config
            .reuse_url
            .as_deref()
            .map(|url| classifier(url, &config.reuse_model));

        let wapiti = WapitiLabeler::new(&config.wapiti_binary, &config.relevance_model);
        let labeler = Arc::new(GatedLabeler::new(
            Arc::new(wapiti),
            config.pool_size,
            timeout,
        ));

        info!(
            binary = %config.binary_model,
            first_level = %config.first_level_model,
            reuse = reuse.is_some(),
            pool_size = config.pool_size,
            timeout_secs = config.timeout_secs,
            "model services initialized"
        );

        Self {
            binary,
            first_level,
            reuse,
            labeler,
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn binary(&self) -> Arc<dyn BatchClassifier> {
        self.binary.clone()
    }

    pub fn first_level(&self) -> Arc<dyn BatchClassifier> {
        self.first_level.clone()
    }

    pub fn reuse(&self) -> Option<Arc<dyn BatchClassifier>> {
        self.reuse
            .as_ref()
            .map(|r| r.clone() as Arc<dyn BatchClassifier>)
    }

    pub fn labeler(&self) -> Arc<dyn SequenceLabeler> {
        self.labeler.clone()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn is_shut_down(&self) -> bool {
        self.labeler.gate().is_closed()
    }

    /// Close every gate; later calls fail with `ServiceUnavailable`
    pub fn shutdown(&self) {
        self.binary.gate().close();
        self.first_level.gate().close();
        if let Some(reuse) = &self.reuse {
            reuse.gate().close();
        }
        self.labeler.gate().close();
        info!("model services shut down");
    }
}
