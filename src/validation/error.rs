//! Error taxonomy for the pose filter

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::JointId;

/// Everything that can go wrong configuring the pipeline or processing a frame
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PoseFilterError {
    /// A filter parameter is out of range; the pipeline is not built
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// The joint table is inconsistent; the pipeline is not built
    #[error("Invalid topology: {reason}")]
    InvalidTopology { reason: String },

    /// The frame does not carry one point per measured joint
    #[error("Measurement shape mismatch: expected {expected} measured joints, received {received}")]
    ShapeMismatch { expected: usize, received: usize },

    /// A coordinate in the frame is NaN or infinite
    #[error("Non-finite measurement for joint {joint} (index {index})")]
    NonFiniteMeasurement { index: usize, joint: JointId },

    /// A coordinate in the frame is too large to filter safely
    #[error("Measurement for joint {joint} (index {index}) has magnitude {magnitude:e}, limit is {limit:e}")]
    MeasurementOutOfRange {
        index: usize,
        joint: JointId,
        magnitude: f64,
        limit: f64,
    },

    /// A named measurement refers to a joint that is not measured in this topology
    #[error("Joint '{name}' is not a measured joint of this topology")]
    UnknownJoint { name: String },

    /// A derived joint's construction axis collapsed; a fallback was used
    #[error("Degenerate geometry deriving {joint}: axis length {magnitude:e}")]
    DegenerateGeometry { joint: JointId, magnitude: f64 },
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Critical,   // Pipeline cannot be built
    High,       // Frame rejected
    Medium,     // Frame rejected, caller input likely malformed
    Warning,    // Frame processed with a fallback
}

/// What the caller should do after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// Drop this frame and submit the next one
    SkipFrame,
    /// Already handled with a fallback value; nothing to do
    Fallback,
    /// Fix the configuration; retrying cannot succeed
    Fail,
}

impl PoseFilterError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PoseFilterError::InvalidParameter { .. } => ErrorSeverity::Critical,
            PoseFilterError::InvalidTopology { .. } => ErrorSeverity::Critical,
            PoseFilterError::ShapeMismatch { .. } => ErrorSeverity::High,
            PoseFilterError::NonFiniteMeasurement { .. } => ErrorSeverity::High,
            PoseFilterError::MeasurementOutOfRange { .. } => ErrorSeverity::High,
            PoseFilterError::UnknownJoint { .. } => ErrorSeverity::Medium,
            PoseFilterError::DegenerateGeometry { .. } => ErrorSeverity::Warning,
        }
    }

    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PoseFilterError::InvalidParameter { .. } | PoseFilterError::InvalidTopology { .. } => {
                RecoveryStrategy::Fail
            }
            PoseFilterError::DegenerateGeometry { .. } => RecoveryStrategy::Fallback,
            _ => RecoveryStrategy::SkipFrame,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }

    /// Whether the frame that raised this error was still processed
    pub fn is_warning(&self) -> bool {
        self.severity() == ErrorSeverity::Warning
    }
}

/// Result type for pose filter operations
pub type FilterResult<T> = Result<T, PoseFilterError>;
