//! Rigid alignment between two coordinate frames from minimal correspondences.
use log::debug;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::EvalError,
    trajectory::{Pose, PoseStream},
    transform::RigidTransform,
};

/// Tolerances used to reject ill-defined correspondences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Direction vectors shorter than this are degenerate.
    pub min_direction_norm: f64,
    /// Angular distance, in radians, under which two directions count as
    /// parallel or antiparallel.
    pub parallel_tolerance: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            min_direction_norm: 1e-9,
            parallel_tolerance: 1e-6,
        }
    }
}

impl AlignmentParams {
    pub fn min_direction_norm(&'_ mut self, value: f64) -> &'_ mut AlignmentParams {
        self.min_direction_norm = value;
        self
    }

    pub fn parallel_tolerance(&'_ mut self, value: f64) -> &'_ mut AlignmentParams {
        self.parallel_tolerance = value;
        self
    }
}

/// Derives the transform that takes `source_origin` onto `target_origin` and
/// rotates `source_dir` onto `target_dir` along the shortest arc.
///
/// # Arguments
///
/// * `source_origin` - Point in the source frame.
/// * `target_origin` - Where `source_origin` must land in the target frame.
/// * `source_dir` - Direction in the source frame.
/// * `target_dir` - Where `source_dir` must point in the target frame.
/// * `params` - Degeneracy tolerances.
///
/// # Returns
///
/// The transform, or `DegenerateAlignment` when a direction is near zero or the
/// directions are (anti)parallel, because the rotation axis is then undefined.
pub fn compute_alignment(
    source_origin: &Vector3<f64>,
    target_origin: &Vector3<f64>,
    source_dir: &Vector3<f64>,
    target_dir: &Vector3<f64>,
    params: &AlignmentParams,
) -> Result<RigidTransform, EvalError> {
    let source_norm = source_dir.norm();
    let target_norm = target_dir.norm();
    if !(source_norm >= params.min_direction_norm && target_norm >= params.min_direction_norm) {
        return Err(EvalError::degenerate_alignment(format!(
            "Direction vectors must have non-zero length (source: {source_norm}, target: {target_norm})"
        )));
    }

    let source_unit = source_dir / source_norm;
    let target_unit = target_dir / target_norm;
    let angle = num::clamp(source_unit.dot(&target_unit), -1.0, 1.0).acos();
    if angle < params.parallel_tolerance {
        return Err(EvalError::degenerate_alignment(
            "Source and target directions are parallel",
        ));
    }
    if std::f64::consts::PI - angle < params.parallel_tolerance {
        return Err(EvalError::degenerate_alignment(
            "Source and target directions are antiparallel",
        ));
    }

    let axis = Unit::new_normalize(source_dir.cross(target_dir));
    let rotation = UnitQuaternion::from_axis_angle(&axis, angle);
    let translation = target_origin - rotation * source_origin;
    debug!(
        "Alignment: axis {:?}, angle {:.6} rad, translation {:?}",
        axis.as_ref(),
        angle,
        translation
    );

    Ok(RigidTransform::new(&translation, &rotation))
}

/// A point and a direction known in both the source and the target frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentCorrespondence {
    pub source_origin: Vector3<f64>,
    pub target_origin: Vector3<f64>,
    pub source_dir: Vector3<f64>,
    pub target_dir: Vector3<f64>,
}

impl AlignmentCorrespondence {
    /// Transform from the source to the target frame, see [`compute_alignment`].
    pub fn solve(&self, params: &AlignmentParams) -> Result<RigidTransform, EvalError> {
        compute_alignment(
            &self.source_origin,
            &self.target_origin,
            &self.source_dir,
            &self.target_dir,
            params,
        )
    }
}

/// Derives the transform that takes the pose `source` exactly onto `target`,
/// both position and orientation.
pub fn compute_pose_alignment(source: &Pose, target: &Pose) -> RigidTransform {
    let rotation = target.orientation * source.orientation.inverse();
    let translation = target.position - rotation * source.position;
    RigidTransform::new(&translation, &rotation)
}

/// Maps a pose stream into the target frame of `transform`.
///
/// Positions become `rotation * position + translation`, orientations become
/// `rotation * orientation`.
pub fn apply(transform: &RigidTransform, stream: &PoseStream) -> PoseStream {
    transform.transform_stream(stream)
}
