use log::info;
use nalgebra::{UnitQuaternion, Vector3};
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::EvalError,
    ground_truth::GroundTruthTrack,
    stats::{rms, Summary},
    trajectory::PoseStream,
};

/// Euclidean distance between two positions.
pub fn position_error(estimated: &Vector3<f64>, ground_truth: &Vector3<f64>) -> f64 {
    (estimated - ground_truth).norm()
}

/// Angle in radians, in `[0, π]`, of the rotation between two orientations.
///
/// Computed as `acos(2 <q1, q2>² - 1)`, which gives the same result for `q` and
/// `-q`.
pub fn orientation_error(lhs: &UnitQuaternion<f64>, rhs: &UnitQuaternion<f64>) -> f64 {
    let dot = lhs.coords.dot(&rhs.coords);
    num::clamp(2.0 * dot * dot - 1.0, -1.0, 1.0).acos()
}

/// Error of one estimated pose against the ground truth at the same time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    pub timestamp: i64,
    /// Distance in meters.
    pub position_error: f64,
    /// Angle in radians.
    pub orientation_error: f64,
}

/// Scores an estimated trajectory against a ground truth track.
pub struct PoseErrorEvaluator<'a> {
    ground_truth: &'a GroundTruthTrack,
}

impl<'a> PoseErrorEvaluator<'a> {
    pub fn new(ground_truth: &'a GroundTruthTrack) -> Self {
        Self { ground_truth }
    }

    /// Computes one error sample per estimated pose.
    ///
    /// # Arguments
    ///
    /// * `estimated` - Trajectory already aligned into the ground truth frame.
    ///
    /// # Returns
    ///
    /// The samples in the order of `estimated`. If any estimated timestamp is
    /// outside the ground truth range the whole call fails with `OutOfRange`.
    pub fn evaluate(&self, estimated: &PoseStream) -> Result<Vec<ErrorSample>, EvalError> {
        if estimated.is_empty() {
            return Err(EvalError::empty_input("Estimated pose stream is empty"));
        }

        let samples = estimated
            .iter()
            .map(|pose| {
                let gt_position = self.ground_truth.position_at(pose.timestamp)?;
                let gt_orientation = self.ground_truth.orientation_at(pose.timestamp)?;
                Ok(ErrorSample {
                    timestamp: pose.timestamp,
                    position_error: position_error(&pose.position, &gt_position),
                    orientation_error: orientation_error(&pose.orientation, &gt_orientation),
                })
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        info!("Evaluated the error of {} poses", samples.len());
        Ok(samples)
    }
}

/// Reduction of one error column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    pub rmse: f64,
    pub median: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(values: &[f64]) -> Self {
        let summary = Summary::from_values(values);
        Self {
            mean: summary.mean,
            rmse: rms(values),
            median: summary.median,
            max: summary.max,
        }
    }
}

/// Absolute trajectory error figures of a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub position: ColumnSummary,
    pub orientation: ColumnSummary,
}

impl ErrorSummary {
    pub fn from_samples(samples: &[ErrorSample]) -> Result<Self, EvalError> {
        if samples.is_empty() {
            return Err(EvalError::empty_input("No error samples to summarize"));
        }

        let position = samples.iter().map(|s| s.position_error).collect::<Vec<_>>();
        let orientation = samples
            .iter()
            .map(|s| s.orientation_error)
            .collect::<Vec<_>>();

        Ok(Self {
            count: samples.len(),
            position: ColumnSummary::from_values(&position),
            orientation: ColumnSummary::from_values(&orientation),
        })
    }

    /// Short human readable description.
    pub fn label(&self) -> String {
        format!(
            "position rmse: {:.5}, orientation rmse: {:.2}°, n = {}",
            self.position.rmse,
            self.orientation.rmse.to_degrees(),
            self.count
        )
    }
}
