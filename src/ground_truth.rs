use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

use crate::{
    error::EvalError,
    trajectory::{Pose, PoseStream},
};

/// Location of a query timestamp inside the track.
enum Bracket {
    /// The timestamp is stored at this index.
    Exact(usize),
    /// The timestamp lies between `lower` and `lower + 1`, `fraction` of the way.
    Between { lower: usize, fraction: f64 },
}

/// Aligned reference trajectory answering continuous-time queries.
///
/// Positions are interpolated linearly per axis. Orientations are interpolated
/// linearly per quaternion component and then renormalized, this is not
/// spherical interpolation. Queries outside of the stored time range fail,
/// the track never extrapolates.
#[derive(Clone, Debug)]
pub struct GroundTruthTrack {
    poses: PoseStream,
}

impl GroundTruthTrack {
    /// Wraps an already aligned pose stream.
    pub fn new(poses: PoseStream) -> Result<Self, EvalError> {
        if poses.is_empty() {
            return Err(EvalError::empty_input("Ground truth track has no poses"));
        }
        Ok(Self { poses })
    }

    pub fn poses(&self) -> &PoseStream {
        &self.poses
    }

    /// First and last timestamps, both inclusive.
    pub fn time_range(&self) -> (i64, i64) {
        let slice = self.poses.as_slice();
        // `new` guarantees at least one pose.
        (slice[0].timestamp, slice[slice.len() - 1].timestamp)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        let (first, last) = self.time_range();
        (first..=last).contains(&timestamp)
    }

    fn bracket(&self, timestamp: i64) -> Result<Bracket, EvalError> {
        let (first, last) = self.time_range();
        if !self.contains(timestamp) {
            return Err(EvalError::OutOfRange {
                timestamp,
                first,
                last,
            });
        }

        let poses = self.poses.as_slice();
        let upper = poses.partition_point(|pose| pose.timestamp < timestamp);
        if poses[upper].timestamp == timestamp {
            return Ok(Bracket::Exact(upper));
        }

        let lower = upper - 1;
        let span = poses[upper].timestamp - poses[lower].timestamp;
        let fraction = (timestamp - poses[lower].timestamp) as f64 / span as f64;
        Ok(Bracket::Between { lower, fraction })
    }

    /// Position at `timestamp`.
    pub fn position_at(&self, timestamp: i64) -> Result<Vector3<f64>, EvalError> {
        let poses = self.poses.as_slice();
        Ok(match self.bracket(timestamp)? {
            Bracket::Exact(index) => poses[index].position,
            Bracket::Between { lower, fraction } => {
                let p0 = &poses[lower].position;
                let p1 = &poses[lower + 1].position;
                p0 + (p1 - p0) * fraction
            }
        })
    }

    /// Orientation at `timestamp`.
    pub fn orientation_at(&self, timestamp: i64) -> Result<UnitQuaternion<f64>, EvalError> {
        let poses = self.poses.as_slice();
        Ok(match self.bracket(timestamp)? {
            Bracket::Exact(index) => poses[index].orientation,
            Bracket::Between { lower, fraction } => {
                let q0 = &poses[lower].orientation.coords;
                let q1 = &poses[lower + 1].orientation.coords;
                Unit::new_normalize(Quaternion::from(q0 + (q1 - q0) * fraction))
            }
        })
    }

    /// Full pose at `timestamp`.
    pub fn pose_at(&self, timestamp: i64) -> Result<Pose, EvalError> {
        Ok(Pose::from_parts(
            timestamp,
            self.position_at(timestamp)?,
            self.orientation_at(timestamp)?,
        ))
    }

    /// Batched [`Self::position_at`], fails if any timestamp is out of range.
    pub fn positions_at(&self, timestamps: &[i64]) -> Result<Vec<Vector3<f64>>, EvalError> {
        timestamps.iter().map(|t| self.position_at(*t)).collect()
    }

    /// Batched [`Self::orientation_at`], fails if any timestamp is out of range.
    pub fn orientations_at(
        &self,
        timestamps: &[i64],
    ) -> Result<Vec<UnitQuaternion<f64>>, EvalError> {
        timestamps.iter().map(|t| self.orientation_at(*t)).collect()
    }

    /// Batched [`Self::pose_at`], fails if any timestamp is out of range.
    pub fn poses_at(&self, timestamps: &[i64]) -> Result<Vec<Pose>, EvalError> {
        timestamps.iter().map(|t| self.pose_at(*t)).collect()
    }
}
