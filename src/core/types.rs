//! Core data types for the pose filter

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::processing::kalman::PositionKalmanFilter;
use crate::processing::low_pass::LowPassCascade;
use crate::validation::error::PoseFilterError;

/// Named skeleton joints, in VNect estimator order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JointId {
    RightShoulder,
    RightForearm,
    RightHand,
    RightThumb,
    RightMiddleFinger,
    LeftShoulder,
    LeftForearm,
    LeftHand,
    LeftThumb,
    LeftMiddleFinger,
    LeftEar,
    LeftEye,
    RightEar,
    RightEye,
    Nose,
    RightThigh,
    RightShin,
    RightFoot,
    RightToe,
    LeftThigh,
    LeftShin,
    LeftFoot,
    LeftToe,
    AbdomenUpper,
    Hip,
    Head,
    Neck,
    Spine,
}

impl JointId {
    /// Every joint, in VNect index order
    pub const ALL: [JointId; 28] = [
        JointId::RightShoulder,
        JointId::RightForearm,
        JointId::RightHand,
        JointId::RightThumb,
        JointId::RightMiddleFinger,
        JointId::LeftShoulder,
        JointId::LeftForearm,
        JointId::LeftHand,
        JointId::LeftThumb,
        JointId::LeftMiddleFinger,
        JointId::LeftEar,
        JointId::LeftEye,
        JointId::RightEar,
        JointId::RightEye,
        JointId::Nose,
        JointId::RightThigh,
        JointId::RightShin,
        JointId::RightFoot,
        JointId::RightToe,
        JointId::LeftThigh,
        JointId::LeftShin,
        JointId::LeftFoot,
        JointId::LeftToe,
        JointId::AbdomenUpper,
        JointId::Hip,
        JointId::Head,
        JointId::Neck,
        JointId::Spine,
    ];

    /// Bone name used by the avatar rig
    pub fn name(&self) -> &'static str {
        match self {
            JointId::RightShoulder => "rShldrBend",
            JointId::RightForearm => "rForearmBend",
            JointId::RightHand => "rHand",
            JointId::RightThumb => "rThumb2",
            JointId::RightMiddleFinger => "rMid1",
            JointId::LeftShoulder => "lShldrBend",
            JointId::LeftForearm => "lForearmBend",
            JointId::LeftHand => "lHand",
            JointId::LeftThumb => "lThumb2",
            JointId::LeftMiddleFinger => "lMid1",
            JointId::LeftEar => "lEar",
            JointId::LeftEye => "lEye",
            JointId::RightEar => "rEar",
            JointId::RightEye => "rEye",
            JointId::Nose => "Nose",
            JointId::RightThigh => "rThighBend",
            JointId::RightShin => "rShin",
            JointId::RightFoot => "rFoot",
            JointId::RightToe => "rToe",
            JointId::LeftThigh => "lThighBend",
            JointId::LeftShin => "lShin",
            JointId::LeftFoot => "lFoot",
            JointId::LeftToe => "lToe",
            JointId::AbdomenUpper => "abdomenUpper",
            JointId::Hip => "hip",
            JointId::Head => "head",
            JointId::Neck => "neck",
            JointId::Spine => "spine",
        }
    }

    /// Look a joint up by its rig bone name
    pub fn from_name(name: &str) -> Option<JointId> {
        JointId::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persistent per-joint filter record
///
/// Owned by the pipeline and indexed by topology index. `raw` is overwritten
/// every frame; the Kalman state and low-pass history carry over between frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointState {
    pub id: JointId,
    /// Latest measurement, received or derived
    pub raw: Vector3<f64>,
    /// Best estimate after Kalman and (optionally) low-pass filtering
    pub filtered: Vector3<f64>,
    pub kalman: PositionKalmanFilter,
    pub history: LowPassCascade,
}

impl JointState {
    pub fn new(id: JointId, low_pass_depth: usize) -> Self {
        Self {
            id,
            raw: Vector3::zeros(),
            filtered: Vector3::zeros(),
            kalman: PositionKalmanFilter::new(),
            history: LowPassCascade::new(low_pass_depth),
        }
    }

    /// Zero every field in place, keeping the history allocation
    pub fn reset(&mut self) {
        self.raw = Vector3::zeros();
        self.filtered = Vector3::zeros();
        self.kalman.reset();
        self.history.reset();
    }
}

/// Output of one accepted frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredFrame {
    /// Zero-based count of frames accepted since creation or the last reset
    pub frame_index: u64,
    /// One filtered position per joint, in topology order
    pub positions: Vec<Vector3<f64>>,
    /// Non-fatal conditions hit while producing this frame
    pub warnings: Vec<PoseFilterError>,
}

impl FilteredFrame {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|p| p.iter().all(|c| c.is_finite()))
    }
}
