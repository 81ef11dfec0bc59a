//! Skeleton topology: which joints exist, which are measured, and how the
//! rest are derived.
//!
//! A [`Topology`] is validated once when it is built. After that every index
//! it hands out is in range and the derivation schedule is ordered so that a
//! rule never reads a joint that has not been populated yet this frame.

use std::collections::{HashMap, HashSet};

use crate::core::types::JointId;
use crate::validation::error::{FilterResult, PoseFilterError};

/// Rule for computing a joint the estimator does not emit
///
/// Generic over how source joints are referenced: rules are declared with
/// [`JointId`]s and resolved to topology indices at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation<T = usize> {
    /// Midpoint of the upper abdomen and the midpoint of both thighs
    Hip { abdomen_upper: T, right_thigh: T, left_thigh: T },
    /// Midpoint of both shoulders
    Neck { right_shoulder: T, left_shoulder: T },
    /// Nose projected onto the neck-to-ears axis
    Head { right_ear: T, left_ear: T, nose: T, neck: T },
    /// Direct alias of the upper abdomen
    Spine { abdomen_upper: T },
}

impl<T: Copy> Derivation<T> {
    pub fn sources(&self) -> Vec<T> {
        match *self {
            Derivation::Hip { abdomen_upper, right_thigh, left_thigh } => {
                vec![abdomen_upper, right_thigh, left_thigh]
            }
            Derivation::Neck { right_shoulder, left_shoulder } => vec![right_shoulder, left_shoulder],
            Derivation::Head { right_ear, left_ear, nose, neck } => vec![right_ear, left_ear, nose, neck],
            Derivation::Spine { abdomen_upper } => vec![abdomen_upper],
        }
    }

    /// Joint whose position stands in for this one on a cold-start degenerate frame
    pub fn fallback_anchor(&self) -> Option<T> {
        match *self {
            Derivation::Head { neck, .. } => Some(neck),
            _ => None,
        }
    }

    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<Derivation<U>, E> {
        Ok(match self {
            Derivation::Hip { abdomen_upper, right_thigh, left_thigh } => Derivation::Hip {
                abdomen_upper: f(abdomen_upper)?,
                right_thigh: f(right_thigh)?,
                left_thigh: f(left_thigh)?,
            },
            Derivation::Neck { right_shoulder, left_shoulder } => Derivation::Neck {
                right_shoulder: f(right_shoulder)?,
                left_shoulder: f(left_shoulder)?,
            },
            Derivation::Head { right_ear, left_ear, nose, neck } => Derivation::Head {
                right_ear: f(right_ear)?,
                left_ear: f(left_ear)?,
                nose: f(nose)?,
                neck: f(neck)?,
            },
            Derivation::Spine { abdomen_upper } => Derivation::Spine { abdomen_upper: f(abdomen_upper)? },
        })
    }
}

/// Whether a joint is fed by the estimator or computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind<T = usize> {
    Measured,
    Derived(Derivation<T>),
}

/// One declared joint, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointSpec {
    pub id: JointId,
    pub kind: JointKind<JointId>,
}

impl JointSpec {
    pub fn measured(id: JointId) -> Self {
        Self { id, kind: JointKind::Measured }
    }

    pub fn derived(id: JointId, rule: Derivation<JointId>) -> Self {
        Self { id, kind: JointKind::Derived(rule) }
    }
}

/// Validated skeleton table
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    ids: Vec<JointId>,
    kinds: Vec<JointKind>,
    index: HashMap<JointId, usize>,
    measured: Vec<usize>,
    schedule: Vec<usize>,
}

impl Topology {
    /// Build and validate a topology from declared joints, in index order
    pub fn new(joints: Vec<JointSpec>) -> FilterResult<Self> {
        let mut index = HashMap::with_capacity(joints.len());
        for (i, joint) in joints.iter().enumerate() {
            if index.insert(joint.id, i).is_some() {
                return Err(invalid(format!("joint {} is declared more than once", joint.id)));
            }
        }

        let mut kinds = Vec::with_capacity(joints.len());
        let mut measured = Vec::new();
        for (i, joint) in joints.iter().enumerate() {
            let kind = match joint.kind {
                JointKind::Measured => {
                    measured.push(i);
                    JointKind::Measured
                }
                JointKind::Derived(rule) => {
                    let resolved = rule.try_map(|source| {
                        index.get(&source).copied().ok_or_else(|| {
                            invalid(format!(
                                "{} is derived from {}, which is not in the topology",
                                joint.id, source
                            ))
                        })
                    })?;
                    if resolved.sources().contains(&i) {
                        return Err(invalid(format!("{} is derived from itself", joint.id)));
                    }
                    JointKind::Derived(resolved)
                }
            };
            kinds.push(kind);
        }

        if measured.is_empty() {
            return Err(invalid("topology has no measured joints".to_string()));
        }

        let schedule = derivation_schedule(&kinds).ok_or_else(|| {
            invalid("derivation rules contain a cycle".to_string())
        })?;

        Ok(Self {
            ids: joints.iter().map(|j| j.id).collect(),
            kinds,
            index,
            measured,
            schedule,
        })
    }

    /// The 24-joint VNect estimator skeleton with hip, head, neck and spine derived
    pub fn vnect() -> FilterResult<Self> {
        let mut joints: Vec<JointSpec> = JointId::ALL[..crate::core::VNECT_MEASURED_JOINTS]
            .iter()
            .map(|&id| JointSpec::measured(id))
            .collect();

        joints.push(JointSpec::derived(
            JointId::Hip,
            Derivation::Hip {
                abdomen_upper: JointId::AbdomenUpper,
                right_thigh: JointId::RightThigh,
                left_thigh: JointId::LeftThigh,
            },
        ));
        joints.push(JointSpec::derived(
            JointId::Head,
            Derivation::Head {
                right_ear: JointId::RightEar,
                left_ear: JointId::LeftEar,
                nose: JointId::Nose,
                neck: JointId::Neck,
            },
        ));
        joints.push(JointSpec::derived(
            JointId::Neck,
            Derivation::Neck {
                right_shoulder: JointId::RightShoulder,
                left_shoulder: JointId::LeftShoulder,
            },
        ));
        joints.push(JointSpec::derived(
            JointId::Spine,
            Derivation::Spine { abdomen_upper: JointId::AbdomenUpper },
        ));

        Self::new(joints)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn measured_count(&self) -> usize {
        self.measured.len()
    }

    pub fn derived_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn index_of(&self, id: JointId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<JointId> {
        self.ids.get(index).copied()
    }

    pub fn ids(&self) -> &[JointId] {
        &self.ids
    }

    pub fn is_measured(&self, index: usize) -> bool {
        matches!(self.kinds.get(index), Some(JointKind::Measured))
    }

    /// Topology indices of measured joints, in the order the estimator sends them
    pub fn measured_indices(&self) -> &[usize] {
        &self.measured
    }

    /// Derived joint indices in an order that satisfies every rule's sources
    pub fn schedule(&self) -> &[usize] {
        &self.schedule
    }

    pub fn derivation(&self, index: usize) -> Option<&Derivation> {
        match self.kinds.get(index) {
            Some(JointKind::Derived(rule)) => Some(rule),
            _ => None,
        }
    }
}

fn invalid(reason: String) -> PoseFilterError {
    PoseFilterError::InvalidTopology { reason }
}

/// Kahn ordering over derived joints; `None` if the rules are cyclic
fn derivation_schedule(kinds: &[JointKind]) -> Option<Vec<usize>> {
    let derived: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, kind)| matches!(kind, JointKind::Derived(_)))
        .map(|(i, _)| i)
        .collect();

    let mut ready: HashSet<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, kind)| matches!(kind, JointKind::Measured))
        .map(|(i, _)| i)
        .collect();

    let mut schedule = Vec::with_capacity(derived.len());
    let mut pending = derived;
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&i| {
            let JointKind::Derived(rule) = &kinds[i] else {
                return false;
            };
            if rule.sources().iter().all(|s| ready.contains(s)) {
                schedule.push(i);
                ready.insert(i);
                false
            } else {
                true
            }
        });
        if pending.len() == before {
            return None;
        }
    }

    Some(schedule)
}
