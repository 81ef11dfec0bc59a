use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_KALMAN_Q, DEFAULT_KALMAN_R, MAX_NOISE_PARAMETER};
use crate::validation::error::{FilterResult, PoseFilterError};

/// Noise parameters shared by every axis filter in a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanParams {
    /// Process noise
    #[serde(default = "default_q")]
    pub q: f64,
    /// Measurement noise
    #[serde(default = "default_r")]
    pub r: f64,
}

fn default_q() -> f64 { DEFAULT_KALMAN_Q }
fn default_r() -> f64 { DEFAULT_KALMAN_R }

impl Default for KalmanParams {
    fn default() -> Self {
        Self { q: default_q(), r: default_r() }
    }
}

impl KalmanParams {
    /// Create validated noise parameters
    pub fn new(q: f64, r: f64) -> FilterResult<Self> {
        let params = Self { q, r };
        params.validate()?;
        Ok(params)
    }

    /// Both parameters must be finite and strictly positive
    pub fn validate(&self) -> FilterResult<()> {
        validate_noise("kalman.q", self.q)?;
        validate_noise("kalman.r", self.r)
    }

    /// Fixed point of the covariance recursion, the positive root of
    /// `P^2 + Q*P - Q*R = 0`
    pub fn steady_state_covariance(&self) -> f64 {
        (-self.q + (self.q * self.q + 4.0 * self.q * self.r).sqrt()) / 2.0
    }

    /// Gain the filter settles to once the covariance has converged
    pub fn steady_state_gain(&self) -> f64 {
        let prior = self.steady_state_covariance() + self.q;
        prior / (prior + self.r)
    }
}

fn validate_noise(parameter: &str, value: f64) -> FilterResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PoseFilterError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: "Noise parameter must be finite and strictly positive".to_string(),
        });
    }
    if value > MAX_NOISE_PARAMETER {
        return Err(PoseFilterError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: format!("Noise parameter must not exceed {}", MAX_NOISE_PARAMETER),
        });
    }
    Ok(())
}

/// Scalar Kalman filter for one axis of one joint
///
/// Starts at zero estimate and zero covariance and converges away from that
/// cold start over the first few frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisKalmanFilter {
    estimate: f64,
    covariance: f64,
    gain: f64,
}

impl AxisKalmanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one measurement into the estimate and return the new estimate
    pub fn update(&mut self, measurement: f64, params: &KalmanParams) -> f64 {
        let prior = self.covariance + params.q;
        self.gain = prior / (prior + params.r);
        self.covariance = params.r * prior / (params.r + prior);
        self.estimate += (measurement - self.estimate) * self.gain;
        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    /// Gain used by the most recent update (zero before the first)
    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn is_finite(&self) -> bool {
        self.estimate.is_finite() && self.covariance.is_finite() && self.gain.is_finite()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Independent x/y/z axis filters for one joint position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionKalmanFilter {
    axes: [AxisKalmanFilter; 3],
}

impl PositionKalmanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update all three axes with a position measurement
    pub fn update(&mut self, measurement: &Vector3<f64>, params: &KalmanParams) -> Vector3<f64> {
        for (axis, value) in self.axes.iter_mut().zip(measurement.iter()) {
            axis.update(*value, params);
        }
        self.get_position()
    }

    /// Get current position estimate
    pub fn get_position(&self) -> Vector3<f64> {
        Vector3::new(self.axes[0].estimate, self.axes[1].estimate, self.axes[2].estimate)
    }

    pub fn gains(&self) -> Vector3<f64> {
        Vector3::new(self.axes[0].gain, self.axes[1].gain, self.axes[2].gain)
    }

    pub fn covariances(&self) -> Vector3<f64> {
        Vector3::new(self.axes[0].covariance, self.axes[1].covariance, self.axes[2].covariance)
    }

    pub fn axes(&self) -> &[AxisKalmanFilter; 3] {
        &self.axes
    }

    pub fn is_finite(&self) -> bool {
        self.axes.iter().all(AxisKalmanFilter::is_finite)
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.axes.iter_mut().for_each(AxisKalmanFilter::reset);
    }
}
