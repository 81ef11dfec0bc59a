//! Skeletal pose post-processing
//!
//! Completes and stabilizes a per-frame 3D skeleton from a pose estimator:
//! implied joints (hip, neck, head, spine) are derived, then every joint is
//! smoothed by a per-axis Kalman filter and an optional low-pass cascade.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod pipeline;

// Re-export commonly used types
pub use crate::core::{Derivation, FilteredFrame, JointId, JointKind, JointSpec, JointState, Topology};
pub use crate::algorithms::DerivedJointComputer;
pub use crate::processing::{AxisKalmanFilter, KalmanParams, LowPassCascade, LowPassConfig, PositionKalmanFilter};
pub use crate::validation::{ErrorSeverity, FilterResult, MeasurementValidator, PoseFilterError, RecoveryStrategy};
pub use crate::utils::{ConfigError, ConfigurationManager, PipelineConfig};
pub use crate::pipeline::PoseFilterPipeline;
