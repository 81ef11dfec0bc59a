//! Anatomically implied joints the estimator does not emit

use nalgebra::Vector3;
use tracing::warn;

use crate::core::{Derivation, JointState, Topology, DEGENERATE_EPSILON};
use crate::validation::error::PoseFilterError;

/// Computes hip, neck, head and spine positions from measured joints
#[derive(Debug, Clone)]
pub struct DerivedJointComputer {
    /// Axis length at or below which normalization is treated as undefined
    epsilon: f64,
}

impl Default for DerivedJointComputer {
    fn default() -> Self {
        Self { epsilon: DEGENERATE_EPSILON }
    }
}

/// Midpoint of two positions
pub fn midpoint(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    (a + b) / 2.0
}

impl DerivedJointComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn hip(
        &self,
        abdomen_upper: &Vector3<f64>,
        right_thigh: &Vector3<f64>,
        left_thigh: &Vector3<f64>,
    ) -> Vector3<f64> {
        midpoint(abdomen_upper, &midpoint(right_thigh, left_thigh))
    }

    pub fn neck(&self, right_shoulder: &Vector3<f64>, left_shoulder: &Vector3<f64>) -> Vector3<f64> {
        midpoint(right_shoulder, left_shoulder)
    }

    /// Project the neck-to-nose vector onto the neck-to-ears axis, anchored at the neck
    ///
    /// Returns the axis length as the error when the ears collapse onto the neck.
    pub fn head(
        &self,
        right_ear: &Vector3<f64>,
        left_ear: &Vector3<f64>,
        nose: &Vector3<f64>,
        neck: &Vector3<f64>,
    ) -> Result<Vector3<f64>, f64> {
        let center_ear = midpoint(right_ear, left_ear);
        let head_vector = center_ear - neck;
        let magnitude = head_vector.norm();

        let axis = match head_vector.try_normalize(self.epsilon) {
            Some(axis) if magnitude.is_finite() => axis,
            _ => return Err(magnitude),
        };

        let nose_vector = nose - neck;
        let head = neck + axis * axis.dot(&nose_vector);
        if head.iter().all(|c| c.is_finite()) {
            Ok(head)
        } else {
            Err(magnitude)
        }
    }

    pub fn spine(&self, abdomen_upper: &Vector3<f64>) -> Vector3<f64> {
        *abdomen_upper
    }

    /// Evaluate one rule against the current raw positions
    pub fn evaluate(&self, rule: &Derivation, raw: &[JointState]) -> Result<Vector3<f64>, f64> {
        let at = |i: usize| &raw[i].raw;
        match *rule {
            Derivation::Hip { abdomen_upper, right_thigh, left_thigh } => {
                Ok(self.hip(at(abdomen_upper), at(right_thigh), at(left_thigh)))
            }
            Derivation::Neck { right_shoulder, left_shoulder } => {
                Ok(self.neck(at(right_shoulder), at(left_shoulder)))
            }
            Derivation::Head { right_ear, left_ear, nose, neck } => {
                self.head(at(right_ear), at(left_ear), at(nose), at(neck))
            }
            Derivation::Spine { abdomen_upper } => Ok(self.spine(at(abdomen_upper))),
        }
    }

    /// Fill in every derived joint's raw value, in schedule order
    ///
    /// A degenerate rule keeps the joint's previous raw value, or on a cold
    /// start takes its fallback anchor's value. Each fallback is returned as a
    /// `DegenerateGeometry` warning.
    pub fn compute(
        &self,
        topology: &Topology,
        joints: &mut [JointState],
        cold_start: bool,
    ) -> Vec<PoseFilterError> {
        let mut warnings = Vec::new();

        for &index in topology.schedule() {
            let Some(rule) = topology.derivation(index) else {
                continue;
            };

            match self.evaluate(rule, joints) {
                Ok(position) => joints[index].raw = position,
                Err(magnitude) => {
                    let joint = joints[index].id;
                    if cold_start {
                        if let Some(anchor) = rule.fallback_anchor() {
                            joints[index].raw = joints[anchor].raw;
                        }
                    }
                    warn!(%joint, magnitude, cold_start, "degenerate geometry, using fallback position");
                    warnings.push(PoseFilterError::DegenerateGeometry { joint, magnitude });
                }
            }
        }

        warnings
    }
}
