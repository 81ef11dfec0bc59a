//! Core types, topology and constants for the pose filter

pub mod types;
pub mod constants;
pub mod topology;

pub use types::*;
pub use constants::*;
pub use topology::{Derivation, JointKind, JointSpec, Topology};
