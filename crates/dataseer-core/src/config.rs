//! DataSeer Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults suitable for a local DeLFT / Wapiti setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ACCEPT_THRESHOLD;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// External model services
    pub services: ServiceConfig,

    /// Pipeline thresholds and feature settings
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATASEER_BINARY_URL") {
            config.services.binary_url = url;
        }
        if let Ok(url) = std::env::var("DATASEER_FIRST_LEVEL_URL") {
            config.services.first_level_url = url;
        }
        if let Ok(url) = std::env::var("DATASEER_REUSE_URL") {
            config.services.reuse_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Ok(path) = std::env::var("DATASEER_WAPITI_BINARY") {
            config.services.wapiti_binary = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("DATASEER_RELEVANCE_MODEL") {
            config.services.relevance_model = PathBuf::from(path);
        }
        if let Ok(value) = std::env::var("DATASEER_TIMEOUT_SECS") {
            config.services.timeout_secs = parse_value("DATASEER_TIMEOUT_SECS", value)?;
        }
        if let Ok(value) = std::env::var("DATASEER_POOL_SIZE") {
            config.services.pool_size = parse_value("DATASEER_POOL_SIZE", value)?;
        }
        if let Ok(value) = std::env::var("DATASEER_ACCEPT_THRESHOLD") {
            config.pipeline.accept_threshold = parse_value("DATASEER_ACCEPT_THRESHOLD", value)?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.services.binary_url != defaults.services.binary_url {
            self.services.binary_url = env_config.services.binary_url;
        }
        if env_config.services.first_level_url != defaults.services.first_level_url {
            self.services.first_level_url = env_config.services.first_level_url;
        }
        if env_config.services.reuse_url.is_some() {
            self.services.reuse_url = env_config.services.reuse_url;
        }
        if env_config.services.wapiti_binary != defaults.services.wapiti_binary {
            self.services.wapiti_binary = env_config.services.wapiti_binary;
        }
        if env_config.services.relevance_model != defaults.services.relevance_model {
            self.services.relevance_model = env_config.services.relevance_model;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        // Numeric settings override whenever the variable is set, even to
        // the default value
        if is_set("DATASEER_TIMEOUT_SECS") {
            self.services.timeout_secs = env_config.services.timeout_secs;
        }
        if is_set("DATASEER_POOL_SIZE") {
            self.services.pool_size = env_config.services.pool_size;
        }
        if is_set("DATASEER_ACCEPT_THRESHOLD") {
            self.pipeline.accept_threshold = env_config.pipeline.accept_threshold;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.pipeline.accept_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.accept_threshold".to_string(),
                value: threshold.to_string(),
            });
        }
        if self.pipeline.position_bins == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.position_bins".to_string(),
                value: "0".to_string(),
            });
        }
        if self.services.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "services.pool_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.services.max_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "services.max_batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// External model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Endpoint of the binary dataset / no_dataset classifier
    pub binary_url: String,

    /// Model name of the binary classifier
    pub binary_model: String,

    /// Endpoint of the dataset-type classifier
    pub first_level_url: String,

    /// Model name of the dataset-type classifier
    pub first_level_model: String,

    /// Endpoint of the reuse classifier (stage 3 is skipped when unset)
    pub reuse_url: Option<String>,

    /// Model name of the reuse classifier
    pub reuse_model: String,

    /// Wapiti executable
    pub wapiti_binary: PathBuf,

    /// Trained relevance (section selection) model
    pub relevance_model: PathBuf,

    /// Timeout for a single service call in seconds
    pub timeout_secs: u64,

    /// Concurrent calls allowed per model instance
    pub pool_size: usize,

    /// Largest batch sent in one classifier call
    pub max_batch_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            binary_url: "http://localhost:8060/classify".to_string(),
            binary_model: "dataseer-binary".to_string(),
            first_level_url: "http://localhost:8060/classify".to_string(),
            first_level_model: "dataseer-first".to_string(),
            reuse_url: None,
            reuse_model: "dataseer-reuse".to_string(),
            wapiti_binary: PathBuf::from("wapiti"),
            relevance_model: PathBuf::from("resources/models/dataseer/model.wapiti"),
            timeout_secs: 30,
            // Model runtimes are not assumed to be thread-safe
            pool_size: 1,
            max_batch_size: 256,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Probability above which a dataset-bearing sentence is annotated
    pub accept_threshold: f64,

    /// Bins for the relative document position feature
    pub position_bins: usize,

    /// Bins for the segment length feature
    pub length_bins: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accept_threshold: ACCEPT_THRESHOLD,
            position_bins: 12,
            length_bins: 12,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::DataseerError {
    fn from(err: ConfigError) -> Self {
        crate::DataseerError::ConfigError(err.to_string())
    }
}
