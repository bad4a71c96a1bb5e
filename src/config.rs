use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::messaging::DEFAULT_WORKER_COUNT;

pub const DEFAULT_RANDOM_URL: &str =
    "https://www.randomnumberapi.com/api/v1.0/random?min=1&max=100";

/// Where module background tasks get their values from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Remote random number API over HTTP
    Http,
    /// In-process random number generator
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,

    /// Endpoint returning a JSON array of integers
    pub url: String,

    /// Inclusive bounds for the local generator
    pub min: i64,
    pub max: i64,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Http,
            url: DEFAULT_RANDOM_URL.to_string(),
            min: 1,
            max: 100,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Number of workers draining the command queue
    pub worker_count: usize,

    /// Interval between background publishes in milliseconds
    pub publish_interval_ms: u64,

    /// Topic name used by background publishes
    pub publish_topic: String,

    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            publish_interval_ms: 500,
            publish_topic: "randomInt".to_string(),
            source: SourceConfig::default(),
        }
    }
}

impl BrokerConfig {
    /// Load configuration from `path`.
    /// Creates a default config file if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = BrokerConfig::default();
            config.save(path)?;
            tracing::info!("Created default config at: {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: BrokerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Default config file location in the user config folder
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("TopicMediator").join("broker.json"))
            .unwrap_or_else(|| PathBuf::from("config").join("broker.json"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.publish_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "publish_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.publish_topic.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "publish_topic must not be empty".to_string(),
            ));
        }
        if self.source.min > self.source.max {
            return Err(ConfigError::Invalid(format!(
                "source.min ({}) is greater than source.max ({})",
                self.source.min, self.source.max
            )));
        }
        Ok(())
    }
}
