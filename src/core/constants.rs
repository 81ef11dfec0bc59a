//! Skeleton sizes and filter defaults

/// Joints emitted directly by the VNect estimator
pub const VNECT_MEASURED_JOINTS: usize = 24;

/// Total joints in the VNect skeleton (measured + derived)
pub const VNECT_JOINT_COUNT: usize = 28;

/// Default Kalman process noise
pub const DEFAULT_KALMAN_Q: f64 = 0.001;

/// Default Kalman measurement noise
pub const DEFAULT_KALMAN_R: f64 = 0.0015;

/// Upper bound accepted for Q and R; beyond this the gain loses precision
pub const MAX_NOISE_PARAMETER: f64 = 1.0e6;

/// Default weight of the incoming stage in the low-pass cascade
pub const DEFAULT_LOW_PASS_ALPHA: f64 = 0.9;

/// Default number of stages in the low-pass history
pub const DEFAULT_LOW_PASS_DEPTH: usize = 6;

/// Deepest cascade accepted by configuration validation
pub const MAX_LOW_PASS_DEPTH: usize = 64;

/// Axis lengths at or below this are treated as degenerate when normalizing
pub const DEGENERATE_EPSILON: f64 = 1.0e-9;

/// Largest coordinate magnitude accepted in a measurement frame
pub const MAX_COORDINATE_MAGNITUDE: f64 = 1.0e9;
