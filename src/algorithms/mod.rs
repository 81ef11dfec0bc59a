//! Skeleton completion algorithms

pub mod derived_joints;

pub use derived_joints::{midpoint, DerivedJointComputer};
