//! Per-joint temporal filtering stages

pub mod kalman;
pub mod low_pass;

pub use kalman::{AxisKalmanFilter, KalmanParams, PositionKalmanFilter};
pub use low_pass::{LowPassCascade, LowPassConfig};
