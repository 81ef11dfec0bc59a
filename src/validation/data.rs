use nalgebra::Vector3;
use std::collections::HashSet;

use crate::core::{JointId, Topology, MAX_COORDINATE_MAGNITUDE};
use crate::validation::error::{FilterResult, PoseFilterError};

/// Configuration for measurement validation
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Largest accepted absolute coordinate value
    pub max_coordinate_magnitude: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_coordinate_magnitude: MAX_COORDINATE_MAGNITUDE,
        }
    }
}

/// Checks an incoming frame before any filter state is touched
#[derive(Debug, Clone, Default)]
pub struct MeasurementValidator {
    config: ValidationConfig,
}

impl MeasurementValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a positional frame: one finite point per measured joint
    pub fn validate_frame(&self, topology: &Topology, measurements: &[Vector3<f64>]) -> FilterResult<()> {
        let expected = topology.measured_count();
        if measurements.len() != expected {
            return Err(PoseFilterError::ShapeMismatch {
                expected,
                received: measurements.len(),
            });
        }

        for (&index, point) in topology.measured_indices().iter().zip(measurements) {
            self.validate_point(index, topology.ids()[index], point)?;
        }
        Ok(())
    }

    /// Reorder an id-keyed frame into measured-joint order, validating as it goes
    pub fn order_named_frame(
        &self,
        topology: &Topology,
        measurements: &[(JointId, Vector3<f64>)],
    ) -> FilterResult<Vec<Vector3<f64>>> {
        let expected = topology.measured_count();
        let mut slots: Vec<Option<Vector3<f64>>> = vec![None; topology.len()];
        let mut seen = HashSet::with_capacity(measurements.len());

        for (id, point) in measurements {
            let index = topology
                .index_of(*id)
                .filter(|&i| topology.is_measured(i))
                .ok_or_else(|| PoseFilterError::UnknownJoint { name: id.name().to_string() })?;
            if seen.insert(*id) {
                slots[index] = Some(*point);
            }
        }

        if measurements.len() != expected || seen.len() != expected {
            return Err(PoseFilterError::ShapeMismatch {
                expected,
                received: seen.len(),
            });
        }

        let ordered: Vec<Vector3<f64>> = topology
            .measured_indices()
            .iter()
            .filter_map(|&i| slots[i])
            .collect();
        self.validate_frame(topology, &ordered)?;
        Ok(ordered)
    }

    fn validate_point(&self, index: usize, joint: JointId, point: &Vector3<f64>) -> FilterResult<()> {
        if !point.iter().all(|c| c.is_finite()) {
            return Err(PoseFilterError::NonFiniteMeasurement { index, joint });
        }

        let magnitude = point.amax();
        if magnitude > self.config.max_coordinate_magnitude {
            return Err(PoseFilterError::MeasurementOutOfRange {
                index,
                joint,
                magnitude,
                limit: self.config.max_coordinate_magnitude,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> Vec<Vector3<f64>> {
        (0..n).map(|i| Vector3::new(i as f64, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_valid_frame_accepted() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::new();
        assert!(validator.validate_frame(&topology, &frame(24)).is_ok());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::new();

        for n in [0, 23, 25, 28] {
            assert_eq!(
                validator.validate_frame(&topology, &frame(n)),
                Err(PoseFilterError::ShapeMismatch { expected: 24, received: n })
            );
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::new();
        let mut measurements = frame(24);
        measurements[14].y = f64::NAN;

        assert_eq!(
            validator.validate_frame(&topology, &measurements),
            Err(PoseFilterError::NonFiniteMeasurement { index: 14, joint: JointId::Nose })
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::with_config(ValidationConfig {
            max_coordinate_magnitude: 10.0,
        });
        let mut measurements = frame(24);
        measurements[2].z = -11.0;

        let err = validator.validate_frame(&topology, &measurements).unwrap_err();
        assert!(matches!(
            err,
            PoseFilterError::MeasurementOutOfRange { index: 2, joint: JointId::RightHand, .. }
        ));
    }

    #[test]
    fn test_named_frame_reordered() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::new();
        let named: Vec<(JointId, Vector3<f64>)> = JointId::ALL[..24]
            .iter()
            .rev()
            .map(|&id| (id, Vector3::new(id as usize as f64, 0.0, 0.0)))
            .collect();

        let ordered = validator.order_named_frame(&topology, &named).unwrap();
        assert_eq!(ordered, frame(24).iter().map(|p| Vector3::new(p.x, 0.0, 0.0)).collect::<Vec<_>>());
    }

    #[test]
    fn test_named_frame_rejects_derived_and_duplicates() {
        let topology = Topology::vnect().unwrap();
        let validator = MeasurementValidator::new();

        let mut named: Vec<(JointId, Vector3<f64>)> =
            JointId::ALL[..24].iter().map(|&id| (id, Vector3::zeros())).collect();
        named[0].0 = JointId::Head;
        assert_eq!(
            validator.order_named_frame(&topology, &named),
            Err(PoseFilterError::UnknownJoint { name: "head".to_string() })
        );

        named[0].0 = JointId::Nose;
        assert_eq!(
            validator.order_named_frame(&topology, &named),
            Err(PoseFilterError::ShapeMismatch { expected: 24, received: 23 })
        );
    }
}
