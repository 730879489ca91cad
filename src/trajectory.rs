use std::ops::Index;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::EvalError;

/// Maximum deviation of an orientation quaternion norm from one.
pub const UNIT_TOLERANCE: f64 = 1e-6;

/// Timestamped position and orientation sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    /// Timestamp in nanoseconds.
    pub timestamp: i64,
    pub position: Vector3<f64>,
    /// Normalized orientation. Its sign is kept as given, `q` and `-q` are
    /// both valid representations of the same rotation.
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Creates a pose from a raw quaternion.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - Timestamp in nanoseconds.
    /// * `position` - Position in meters.
    /// * `orientation` - Quaternion, its norm must be one within [`UNIT_TOLERANCE`].
    pub fn new(
        timestamp: i64,
        position: Vector3<f64>,
        orientation: Quaternion<f64>,
    ) -> Result<Self, EvalError> {
        let norm = orientation.norm();
        if !position.iter().all(|v| v.is_finite()) || !norm.is_finite() {
            return Err(EvalError::ingestion(format!(
                "Pose at {timestamp} has non-finite values"
            )));
        }
        if (norm - 1.0).abs() > UNIT_TOLERANCE {
            return Err(EvalError::ingestion(format!(
                "Pose at {timestamp} has a non-unit orientation (norm = {norm})"
            )));
        }

        Ok(Self {
            timestamp,
            position,
            orientation: UnitQuaternion::new_normalize(orientation),
        })
    }

    /// Creates a pose from an already normalized orientation.
    pub fn from_parts(
        timestamp: i64,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            timestamp,
            position,
            orientation,
        }
    }
}

/// Sequence of poses with strictly increasing timestamps.
/// Used for both ground truth and estimated trajectories.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseStream {
    poses: Vec<Pose>,
}

impl PoseStream {
    /// Creates a stream, failing if the timestamps are duplicated or out of order.
    pub fn new(poses: Vec<Pose>) -> Result<Self, EvalError> {
        if let Some(pair) = poses
            .windows(2)
            .find(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err(EvalError::ingestion(format!(
                "Pose timestamps must be strictly increasing, found {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { poses })
    }

    /// The caller guarantees the timestamp ordering.
    pub(crate) fn from_ordered(poses: Vec<Pose>) -> Self {
        Self { poses }
    }

    /// Adds a new pose to the end of the stream.
    ///
    /// # Arguments
    ///
    /// * `pose` - Its timestamp must be greater than the last one.
    pub fn push(&mut self, pose: Pose) -> Result<(), EvalError> {
        if let Some(last) = self.poses.last() {
            if pose.timestamp <= last.timestamp {
                return Err(EvalError::ingestion(format!(
                    "Pose timestamp {} is not after {}",
                    pose.timestamp, last.timestamp
                )));
            }
        }
        self.poses.push(pose);
        Ok(())
    }

    /// Returns the number of poses in the stream.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Returns true if the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pose> + '_ {
        self.poses.iter()
    }

    pub fn as_slice(&self) -> &[Pose] {
        &self.poses
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.poses.iter().map(|pose| pose.timestamp).collect()
    }

    pub fn first(&self) -> Option<&Pose> {
        self.poses.first()
    }

    pub fn last(&self) -> Option<&Pose> {
        self.poses.last()
    }

    /// Creates a new stream with the given index range.
    ///
    /// # Arguments
    ///
    /// * `start` - Inclusive start index of the range.
    /// * `end` - Exclusive end index of the range.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            poses: self.poses[start..end].to_vec(),
        }
    }
}

impl TryFrom<Vec<Pose>> for PoseStream {
    type Error = EvalError;

    fn try_from(poses: Vec<Pose>) -> Result<Self, Self::Error> {
        Self::new(poses)
    }
}

impl Index<usize> for PoseStream {
    type Output = Pose;
    /// Returns the pose at the given index.
    fn index(&self, index: usize) -> &Self::Output {
        &self.poses[index]
    }
}

impl<'a> IntoIterator for &'a PoseStream {
    type Item = &'a Pose;
    type IntoIter = std::slice::Iter<'a, Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}
