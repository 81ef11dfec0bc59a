use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::processing::kalman::KalmanParams;
use crate::processing::low_pass::LowPassConfig;
use crate::validation::error::{FilterResult, PoseFilterError};

/// Filter parameters for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Kalman noise parameters
    #[serde(default)]
    pub kalman: KalmanParams,
    /// Optional cascaded low-pass stage
    #[serde(default)]
    pub low_pass: LowPassConfig,
}

impl PipelineConfig {
    pub fn new(kalman: KalmanParams, low_pass: LowPassConfig) -> FilterResult<Self> {
        let config = Self { kalman, low_pass };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FilterResult<()> {
        self.kalman.validate()?;
        self.low_pass.validate()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] PoseFilterError),
    #[error("No file path set for saving configuration")]
    NoPath,
}

/// Holds a pipeline configuration and applies validated edits to it
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: PipelineConfig,
    /// Configuration file path
    config_file_path: Option<String>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: PipelineConfig) -> FilterResult<()> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        self.config = PipelineConfig::from_json_str(&content)?;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(&self.config)?;

        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoPath),
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment; each setter returns the previous value

    pub fn set_kalman_q(&mut self, q: f64) -> FilterResult<f64> {
        let kalman = KalmanParams::new(q, self.config.kalman.r)?;
        Ok(self.apply(|config| std::mem::replace(&mut config.kalman, kalman).q))
    }

    pub fn set_kalman_r(&mut self, r: f64) -> FilterResult<f64> {
        let kalman = KalmanParams::new(self.config.kalman.q, r)?;
        Ok(self.apply(|config| std::mem::replace(&mut config.kalman, kalman).r))
    }

    pub fn set_low_pass_alpha(&mut self, alpha: f64) -> FilterResult<f64> {
        let low_pass = LowPassConfig { alpha, ..self.config.low_pass };
        low_pass.validate()?;
        Ok(self.apply(|config| std::mem::replace(&mut config.low_pass, low_pass).alpha))
    }

    pub fn set_low_pass_depth(&mut self, depth: usize) -> FilterResult<usize> {
        let low_pass = LowPassConfig { depth, ..self.config.low_pass };
        low_pass.validate()?;
        Ok(self.apply(|config| std::mem::replace(&mut config.low_pass, low_pass).depth))
    }

    pub fn set_low_pass_enabled(&mut self, enabled: bool) -> FilterResult<bool> {
        let low_pass = LowPassConfig { enabled, ..self.config.low_pass };
        low_pass.validate()?;
        Ok(self.apply(|config| std::mem::replace(&mut config.low_pass, low_pass).enabled))
    }

    fn apply<T>(&mut self, edit: impl FnOnce(&mut PipelineConfig) -> T) -> T {
        self.is_modified = true;
        edit(&mut self.config)
    }
}
