//! Input validation and error reporting

pub mod data;
pub mod error;

pub use data::{MeasurementValidator, ValidationConfig};
pub use error::{ErrorSeverity, FilterResult, PoseFilterError, RecoveryStrategy};
