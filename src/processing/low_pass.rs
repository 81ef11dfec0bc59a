//! Cascaded single-pole low-pass smoothing
//!
//! Each stage blends its previous value with the stage before it, so a deeper
//! cascade smooths harder and lags more without adding parameters.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_LOW_PASS_ALPHA, DEFAULT_LOW_PASS_DEPTH, MAX_LOW_PASS_DEPTH};
use crate::validation::error::{FilterResult, PoseFilterError};

/// Low-pass stage settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPassConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Weight of the incoming stage, in [0, 1]; 1 passes through unchanged
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Number of history slots, at least 1 when enabled
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_enabled() -> bool { true }
fn default_alpha() -> f64 { DEFAULT_LOW_PASS_ALPHA }
fn default_depth() -> usize { DEFAULT_LOW_PASS_DEPTH }

impl Default for LowPassConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            alpha: default_alpha(),
            depth: default_depth(),
        }
    }
}

impl LowPassConfig {
    pub fn new(alpha: f64, depth: usize) -> FilterResult<Self> {
        let config = Self { enabled: true, alpha, depth };
        config.validate()?;
        Ok(config)
    }

    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// Build from a smoothing parameter that weights the previous stage value
    /// instead of the incoming one
    pub fn from_legacy_param(param: f64, depth: usize) -> FilterResult<Self> {
        Self::new(1.0 - param, depth)
    }

    /// History length to allocate; disabled configs still keep one slot
    pub fn history_len(&self) -> usize {
        self.depth.max(1)
    }

    pub fn validate(&self) -> FilterResult<()> {
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            return Err(PoseFilterError::InvalidParameter {
                parameter: "low_pass.alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "Smoothing factor must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.enabled && self.depth < 1 {
            return Err(PoseFilterError::InvalidParameter {
                parameter: "low_pass.depth".to_string(),
                value: self.depth.to_string(),
                reason: "Cascade depth must be at least 1 when low-pass is enabled".to_string(),
            });
        }

        if self.depth > MAX_LOW_PASS_DEPTH {
            return Err(PoseFilterError::InvalidParameter {
                parameter: "low_pass.depth".to_string(),
                value: self.depth.to_string(),
                reason: format!("Cascade depth must not exceed {}", MAX_LOW_PASS_DEPTH),
            });
        }

        Ok(())
    }
}

/// Fixed-depth history of one joint's filtered positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowPassCascade {
    history: Vec<Vector3<f64>>,
}

impl LowPassCascade {
    /// Create a zeroed cascade; a depth of 0 is raised to 1
    pub fn new(depth: usize) -> Self {
        Self {
            history: vec![Vector3::zeros(); depth.max(1)],
        }
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    /// Stage values, freshest input first
    pub fn history(&self) -> &[Vector3<f64>] {
        &self.history
    }

    /// Push a new input through every stage and return the last stage
    pub fn apply(&mut self, input: Vector3<f64>, alpha: f64) -> Vector3<f64> {
        self.history[0] = input;
        for i in 1..self.history.len() {
            self.history[i] = self.history[i - 1] * alpha + self.history[i] * (1.0 - alpha);
        }
        self.history[self.history.len() - 1]
    }

    /// Change the number of stages, padding with the most lagged value
    pub fn resize(&mut self, depth: usize) {
        let depth = depth.max(1);
        let last = self.history[self.history.len() - 1];
        self.history.resize(depth, last);
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|slot| *slot = Vector3::zeros());
    }
}
