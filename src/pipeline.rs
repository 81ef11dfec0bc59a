//! Per-frame pose post-processing
//!
//! A [`PoseFilterPipeline`] owns one skeleton's filter state. Each accepted
//! frame runs, in order: measured joints are written, derived joints are
//! computed, every joint is Kalman filtered, and every joint is optionally
//! low-pass filtered. A rejected frame leaves the state exactly as it was.

use nalgebra::Vector3;
use tracing::{debug, trace, warn};

use crate::algorithms::DerivedJointComputer;
use crate::core::{FilteredFrame, JointId, JointState, Topology};
use crate::processing::{KalmanParams, LowPassConfig};
use crate::utils::config::PipelineConfig;
use crate::validation::data::MeasurementValidator;
use crate::validation::error::FilterResult;

/// Stateful filter for one tracked skeleton
#[derive(Debug, Clone)]
pub struct PoseFilterPipeline {
    topology: Topology,
    config: PipelineConfig,
    joints: Vec<JointState>,
    derived: DerivedJointComputer,
    validator: MeasurementValidator,
    frames_processed: u64,
}

impl PoseFilterPipeline {
    /// Build a pipeline, rejecting non-positive noise or an invalid low-pass setup
    pub fn initialize(
        topology: Topology,
        kalman_q: f64,
        kalman_r: f64,
        low_pass: LowPassConfig,
    ) -> FilterResult<Self> {
        let config = PipelineConfig::new(KalmanParams::new(kalman_q, kalman_r)?, low_pass)?;
        Self::from_config(topology, &config)
    }

    pub fn from_config(topology: Topology, config: &PipelineConfig) -> FilterResult<Self> {
        config.validate()?;

        let depth = config.low_pass.history_len();
        let joints = topology.ids().iter().map(|&id| JointState::new(id, depth)).collect();

        debug!(
            joints = topology.len(),
            measured = topology.measured_count(),
            derived = topology.derived_count(),
            q = config.kalman.q,
            r = config.kalman.r,
            low_pass = config.low_pass.enabled,
            alpha = config.low_pass.alpha,
            depth,
            "pose filter pipeline initialized"
        );

        Ok(Self {
            topology,
            config: *config,
            joints,
            derived: DerivedJointComputer::new(),
            validator: MeasurementValidator::new(),
            frames_processed: 0,
        })
    }

    /// Replace the measurement validator, e.g. to change the coordinate limit
    pub fn with_validator(mut self, validator: MeasurementValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Filter one frame of measured joint positions, given in topology order
    pub fn process_frame(&mut self, measurements: &[Vector3<f64>]) -> FilterResult<FilteredFrame> {
        if let Err(err) = self.validator.validate_frame(&self.topology, measurements) {
            warn!(error = %err, frame = self.frames_processed, "rejected measurement frame");
            return Err(err);
        }

        for (&index, point) in self.topology.measured_indices().iter().zip(measurements) {
            self.joints[index].raw = *point;
        }

        let cold_start = self.frames_processed == 0;
        let warnings = self.derived.compute(&self.topology, &mut self.joints, cold_start);

        let params = self.config.kalman;
        for joint in &mut self.joints {
            joint.filtered = joint.kalman.update(&joint.raw, &params);
        }

        let low_pass = self.config.low_pass;
        if low_pass.enabled {
            for joint in &mut self.joints {
                joint.filtered = joint.history.apply(joint.filtered, low_pass.alpha);
            }
        }

        let frame_index = self.frames_processed;
        self.frames_processed += 1;
        trace!(frame = frame_index, warnings = warnings.len(), "frame filtered");

        Ok(FilteredFrame {
            frame_index,
            positions: self.positions(),
            warnings,
        })
    }

    /// Filter one frame given as (joint, position) pairs in any order
    pub fn process_named_frame(&mut self, measurements: &[(JointId, Vector3<f64>)]) -> FilterResult<FilteredFrame> {
        let ordered = match self.validator.order_named_frame(&self.topology, measurements) {
            Ok(ordered) => ordered,
            Err(err) => {
                warn!(error = %err, frame = self.frames_processed, "rejected named measurement frame");
                return Err(err);
            }
        };
        self.process_frame(&ordered)
    }

    /// Zero all persistent filter state in place
    pub fn reset(&mut self) {
        self.joints.iter_mut().for_each(JointState::reset);
        self.frames_processed = 0;
        debug!("pose filter pipeline reset");
    }

    /// Change the Kalman noise parameters, returning the previous ones
    pub fn set_kalman_params(&mut self, q: f64, r: f64) -> FilterResult<KalmanParams> {
        let params = KalmanParams::new(q, r)?;
        Ok(std::mem::replace(&mut self.config.kalman, params))
    }

    /// Change the low-pass settings, resizing every history if the depth moved
    pub fn set_low_pass(&mut self, low_pass: LowPassConfig) -> FilterResult<LowPassConfig> {
        low_pass.validate()?;
        if low_pass.history_len() != self.config.low_pass.history_len() {
            let depth = low_pass.history_len();
            self.joints.iter_mut().for_each(|joint| joint.history.resize(depth));
        }
        Ok(std::mem::replace(&mut self.config.low_pass, low_pass))
    }

    /// Current filtered position of every joint, in topology order
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.joints.iter().map(|joint| joint.filtered).collect()
    }

    pub fn position(&self, id: JointId) -> Option<Vector3<f64>> {
        self.joint(id).map(|joint| joint.filtered)
    }

    pub fn joint(&self, id: JointId) -> Option<&JointState> {
        self.topology.index_of(id).map(|index| &self.joints[index])
    }

    pub fn joints(&self) -> &[JointState] {
        &self.joints
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Frames accepted since creation or the last reset
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error::PoseFilterError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn vnect_pipeline(low_pass: LowPassConfig) -> PoseFilterPipeline {
        PoseFilterPipeline::initialize(Topology::vnect().unwrap(), 0.001, 0.0015, low_pass).unwrap()
    }

    /// A plausible standing pose, in metres
    fn standing_frame() -> Vec<Vector3<f64>> {
        let mut frame = vec![Vector3::zeros(); 24];
        let mut put = |id: JointId, x: f64, y: f64, z: f64| frame[id as usize] = Vector3::new(x, y, z);
        put(JointId::RightShoulder, 0.2, 1.45, 0.0);
        put(JointId::LeftShoulder, -0.2, 1.45, 0.0);
        put(JointId::RightForearm, 0.25, 1.15, 0.0);
        put(JointId::LeftForearm, -0.25, 1.15, 0.0);
        put(JointId::RightHand, 0.27, 0.9, 0.05);
        put(JointId::LeftHand, -0.27, 0.9, 0.05);
        put(JointId::RightEar, 0.07, 1.62, -0.02);
        put(JointId::LeftEar, -0.07, 1.62, -0.02);
        put(JointId::Nose, 0.0, 1.6, 0.1);
        put(JointId::RightThigh, 0.1, 0.95, 0.0);
        put(JointId::LeftThigh, -0.1, 0.95, 0.0);
        put(JointId::RightShin, 0.1, 0.5, 0.0);
        put(JointId::LeftShin, -0.1, 0.5, 0.0);
        put(JointId::AbdomenUpper, 0.0, 1.15, 0.0);
        frame
    }

    fn random_frame(rng: &mut StdRng, bound: f64) -> Vec<Vector3<f64>> {
        (0..24)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-bound..bound),
                    rng.gen_range(-bound..bound),
                    rng.gen_range(-bound..bound),
                )
            })
            .collect()
    }

    #[test]
    fn test_initialize_rejects_bad_parameters() {
        let topology = Topology::vnect().unwrap();
        let cases = [
            (0.0, 0.1, LowPassConfig::default()),
            (0.1, -0.1, LowPassConfig::default()),
            (0.1, 0.1, LowPassConfig { enabled: true, alpha: 1.2, depth: 6 }),
            (0.1, 0.1, LowPassConfig { enabled: true, alpha: 0.5, depth: 0 }),
        ];
        for (q, r, low_pass) in cases {
            let result = PoseFilterPipeline::initialize(topology.clone(), q, r, low_pass);
            assert!(matches!(result, Err(PoseFilterError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_output_covers_every_joint_in_order() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        let frame = pipeline.process_frame(&standing_frame()).unwrap();

        assert_eq!(frame.frame_index, 0);
        assert_eq!(frame.positions.len(), 28);
        assert!(frame.is_finite());
        assert!(!frame.has_warnings());
        assert_eq!(frame.positions, pipeline.positions());
        assert_eq!(pipeline.frames_processed(), 1);
    }

    #[test]
    fn test_spine_aliases_abdomen_every_frame() {
        let mut pipeline = vnect_pipeline(LowPassConfig::disabled());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            pipeline.process_frame(&random_frame(&mut rng, 2.0)).unwrap();
            let spine = pipeline.joint(JointId::Spine).unwrap();
            let abdomen = pipeline.joint(JointId::AbdomenUpper).unwrap();
            assert_eq!(spine.raw, abdomen.raw);
            // Same raw inputs and the same state history, so the same estimate
            assert_eq!(spine.filtered, abdomen.filtered);
        }
    }

    #[test]
    fn test_derived_joints_from_known_inputs() {
        let mut pipeline = vnect_pipeline(LowPassConfig::disabled());
        let mut frame = vec![Vector3::new(0.0, 5.0, 0.0); 24];
        frame[JointId::RightThigh as usize] = Vector3::new(1.0, 0.0, 0.0);
        frame[JointId::LeftThigh as usize] = Vector3::new(-1.0, 0.0, 0.0);
        frame[JointId::AbdomenUpper as usize] = Vector3::new(0.0, 2.0, 0.0);
        frame[JointId::RightShoulder as usize] = Vector3::new(1.0, 1.0, 0.0);
        frame[JointId::LeftShoulder as usize] = Vector3::new(-1.0, 1.0, 0.0);

        pipeline.process_frame(&frame).unwrap();

        assert_eq!(pipeline.joint(JointId::Hip).unwrap().raw, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(pipeline.joint(JointId::Neck).unwrap().raw, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(pipeline.joint(JointId::Spine).unwrap().raw, Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_shape_mismatch_leaves_state_untouched() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        pipeline.process_frame(&standing_frame()).unwrap();
        pipeline.process_frame(&standing_frame()).unwrap();
        let joints_before = pipeline.joints().to_vec();

        let mut short = standing_frame();
        short.pop();
        let err = pipeline.process_frame(&short).unwrap_err();

        assert_eq!(err, PoseFilterError::ShapeMismatch { expected: 24, received: 23 });
        assert_eq!(pipeline.joints(), joints_before.as_slice());
        assert_eq!(pipeline.frames_processed(), 2);
    }

    #[test]
    fn test_non_finite_frame_leaves_state_untouched() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        pipeline.process_frame(&standing_frame()).unwrap();
        let joints_before = pipeline.joints().to_vec();

        let mut frame = standing_frame();
        frame[3].x = f64::INFINITY;

        assert!(matches!(
            pipeline.process_frame(&frame),
            Err(PoseFilterError::NonFiniteMeasurement { index: 3, .. })
        ));
        assert_eq!(pipeline.joints(), joints_before.as_slice());
    }

    #[test]
    fn test_reset_matches_fresh_pipeline() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut used = vnect_pipeline(LowPassConfig::default());
        for _ in 0..25 {
            used.process_frame(&random_frame(&mut rng, 1.5)).unwrap();
        }
        used.reset();
        assert_eq!(used.frames_processed(), 0);

        let mut fresh = vnect_pipeline(LowPassConfig::default());
        let measurement = standing_frame();

        assert_eq!(used.process_frame(&measurement).unwrap(), fresh.process_frame(&measurement).unwrap());
        assert_eq!(used.joints(), fresh.joints());
    }

    #[test]
    fn test_static_pose_converges() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        let frame = standing_frame();
        for _ in 0..2000 {
            pipeline.process_frame(&frame).unwrap();
        }

        for (joint, target) in pipeline.joints().iter().zip(&frame) {
            assert!((joint.filtered - target).norm() < 1e-6, "{} did not converge", joint.id);
        }
        let head = pipeline.position(JointId::Head).unwrap();
        assert!((head - pipeline.joint(JointId::Head).unwrap().raw).norm() < 1e-6);
    }

    #[test]
    fn test_alpha_one_matches_kalman_only() {
        let mut smoothed = vnect_pipeline(LowPassConfig::new(1.0, 6).unwrap());
        let mut plain = vnect_pipeline(LowPassConfig::disabled());
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..30 {
            let frame = random_frame(&mut rng, 1.0);
            assert_eq!(
                smoothed.process_frame(&frame).unwrap().positions,
                plain.process_frame(&frame).unwrap().positions
            );
        }
    }

    #[test]
    fn test_low_pass_adds_lag() {
        let mut smoothed = vnect_pipeline(LowPassConfig::new(0.3, 6).unwrap());
        let mut plain = vnect_pipeline(LowPassConfig::disabled());
        let frame = standing_frame();

        let smoothed_out = smoothed.process_frame(&frame).unwrap();
        let plain_out = plain.process_frame(&frame).unwrap();

        let nose = JointId::Nose as usize;
        assert!(smoothed_out.positions[nose].norm() < plain_out.positions[nose].norm());
    }

    #[test]
    fn test_degenerate_head_reported_and_finite() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        let mut frame = standing_frame();
        // Ears collapse onto the shoulder midpoint
        frame[JointId::RightEar as usize] = Vector3::new(0.0, 1.45, 0.0);
        frame[JointId::LeftEar as usize] = Vector3::new(0.0, 1.45, 0.0);

        let out = pipeline.process_frame(&frame).unwrap();

        assert_eq!(
            out.warnings,
            vec![PoseFilterError::DegenerateGeometry { joint: JointId::Head, magnitude: 0.0 }]
        );
        assert!(out.is_finite());
        assert_eq!(
            pipeline.joint(JointId::Head).unwrap().raw,
            pipeline.joint(JointId::Neck).unwrap().raw
        );
    }

    #[test]
    fn test_named_frame_matches_positional() {
        let mut named_pipeline = vnect_pipeline(LowPassConfig::default());
        let mut positional = vnect_pipeline(LowPassConfig::default());
        let frame = standing_frame();
        let named: Vec<(JointId, Vector3<f64>)> = frame
            .iter()
            .enumerate()
            .rev()
            .map(|(i, p)| (JointId::ALL[i], *p))
            .collect();

        assert_eq!(
            named_pipeline.process_named_frame(&named).unwrap(),
            positional.process_frame(&frame).unwrap()
        );
        assert!(matches!(
            named_pipeline.process_named_frame(&named[1..]),
            Err(PoseFilterError::ShapeMismatch { expected: 24, received: 23 })
        ));
    }

    #[test]
    fn test_runtime_retuning() {
        let mut pipeline = vnect_pipeline(LowPassConfig::default());
        pipeline.process_frame(&standing_frame()).unwrap();

        let old = pipeline.set_kalman_params(0.01, 0.01).unwrap();
        assert_eq!(old, KalmanParams { q: 0.001, r: 0.0015 });
        assert!(pipeline.set_kalman_params(0.0, 0.01).is_err());
        assert_eq!(pipeline.config().kalman, KalmanParams { q: 0.01, r: 0.01 });

        pipeline.set_low_pass(LowPassConfig::new(0.5, 3).unwrap()).unwrap();
        assert!(pipeline.joints().iter().all(|joint| joint.history.depth() == 3));
        assert!(pipeline.set_low_pass(LowPassConfig { enabled: true, alpha: 0.5, depth: 0 }).is_err());

        assert!(pipeline.process_frame(&standing_frame()).unwrap().is_finite());
    }

    #[test]
    fn test_randomized_frames_stay_finite() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut pipeline = vnect_pipeline(LowPassConfig::default());

        for _ in 0..10_000 {
            let frame = random_frame(&mut rng, 10.0);
            let out = pipeline.process_frame(&frame).unwrap();
            assert!(out.is_finite());
        }

        for joint in pipeline.joints() {
            assert!(joint.kalman.is_finite());
            let gains = joint.kalman.gains();
            assert!(gains.iter().all(|&k| k > 0.0 && k <= 1.0));
        }
    }

    #[test]
    fn test_pipeline_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PoseFilterPipeline>();
    }
}
