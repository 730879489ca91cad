use nalgebra::{Isometry3, Matrix4, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

use std::ops;

use crate::{
    error::EvalError,
    trajectory::{Pose, PoseStream, UNIT_TOLERANCE},
};

/// Rotation followed by translation, mapping one coordinate frame into another.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidTransform(Isometry3<f64>);

impl RigidTransform {
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    /// Creates a transform.
    ///
    /// # Arguments
    ///
    /// * `translation` - Translation applied after the rotation.
    /// * `rotation` - Rotation.
    pub fn new(translation: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(*translation),
            *rotation,
        ))
    }

    /// Creates a transform from a raw (w, x, y, z) quaternion, which must be unit.
    pub fn from_parts(
        translation: &Vector3<f64>,
        rotation: &Quaternion<f64>,
    ) -> Result<Self, EvalError> {
        let norm = rotation.norm();
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_TOLERANCE {
            return Err(EvalError::ingestion(format!(
                "Transform rotation is not unit (norm = {norm})"
            )));
        }
        Ok(Self::new(translation, &UnitQuaternion::new_normalize(*rotation)))
    }

    pub fn rotation(&self) -> &UnitQuaternion<f64> {
        &self.0.rotation
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.0.rotation.angle()
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Applies rotation and translation to a point.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        (self.0 * Point3::from(*point)).coords
    }

    /// Applies only the rotation, for directions.
    pub fn rotate_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.0.rotation * vector
    }

    /// Composes the rotation on the left of `orientation`.
    pub fn transform_orientation(&self, orientation: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        self.0.rotation * orientation
    }

    pub fn transform_pose(&self, pose: &Pose) -> Pose {
        Pose::from_parts(
            pose.timestamp,
            self.transform_point(&pose.position),
            self.transform_orientation(&pose.orientation),
        )
    }

    /// Maps every pose of the stream into the target frame. Timestamps are kept.
    pub fn transform_stream(&self, stream: &PoseStream) -> PoseStream {
        PoseStream::from_ordered(stream.iter().map(|pose| self.transform_pose(pose)).collect())
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ops::Mul<&RigidTransform> for &RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: &RigidTransform) -> Self::Output {
        RigidTransform(self.0 * rhs.0)
    }
}

impl From<RigidTransform> for Matrix4<f64> {
    fn from(transform: RigidTransform) -> Self {
        transform.0.into()
    }
}
