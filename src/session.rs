use log::{info, warn};

use crate::{
    alignment::{self, AlignmentCorrespondence},
    error::EvalError,
    frame_distance::FrameDistanceEvaluator,
    frames::{FrameMatcher, FrameStream},
    ground_truth::GroundTruthTrack,
    image::ImageHandle,
    metrics::PoseErrorEvaluator,
    params::EvalParams,
    results::{RunConfig, RunResults},
    trajectory::PoseStream,
    transform::RigidTransform,
};

/// Reference data shared by every run evaluated against the same dataset.
///
/// The ground truth and the estimated-to-ground-truth transform are fixed at
/// construction and reused for each run.
pub struct EvaluationSession<H> {
    ground_truth: GroundTruthTrack,
    ground_truth_frames: FrameStream<H>,
    to_ground_truth: RigidTransform,
    params: EvalParams,
    frame_evaluator: FrameDistanceEvaluator,
}

impl<H: ImageHandle + Clone> EvaluationSession<H> {
    /// # Arguments
    ///
    /// * `ground_truth` - Reference trajectory.
    /// * `ground_truth_frames` - Reference video, may be empty when no run
    ///   captures frames.
    /// * `to_ground_truth` - Maps estimated coordinates onto the ground truth.
    /// * `params` - Session parameters.
    pub fn new(
        ground_truth: GroundTruthTrack,
        ground_truth_frames: FrameStream<H>,
        to_ground_truth: RigidTransform,
        params: EvalParams,
    ) -> Result<Self, EvalError> {
        let frame_evaluator = FrameDistanceEvaluator::new(params.frame_distance.clone())?;
        Ok(Self {
            ground_truth,
            ground_truth_frames,
            to_ground_truth,
            params,
            frame_evaluator,
        })
    }

    /// Like [`EvaluationSession::new`], solving the estimated-to-ground-truth
    /// transform from `correspondence` with the `alignment` tolerances of
    /// `params`.
    pub fn from_correspondence(
        ground_truth: GroundTruthTrack,
        ground_truth_frames: FrameStream<H>,
        correspondence: &AlignmentCorrespondence,
        params: EvalParams,
    ) -> Result<Self, EvalError> {
        let to_ground_truth = correspondence.solve(&params.alignment)?;
        Self::new(ground_truth, ground_truth_frames, to_ground_truth, params)
    }

    pub fn ground_truth(&self) -> &GroundTruthTrack {
        &self.ground_truth
    }

    pub fn to_ground_truth(&self) -> &RigidTransform {
        &self.to_ground_truth
    }

    pub fn params(&self) -> &EvalParams {
        &self.params
    }

    /// Evaluates one run.
    ///
    /// Poses are aligned with the session transform before being compared. A
    /// run that captured poses must provide them. Frames are compared only
    /// when both the run captured them and the session has reference frames.
    pub fn evaluate_run(
        &self,
        config: RunConfig,
        poses: Option<&PoseStream>,
        frames: Option<&FrameStream<H>>,
    ) -> Result<RunResults, EvalError> {
        config.validate()?;
        let mut results = RunResults::new(config);

        if config.capture_poses {
            let poses = poses.ok_or_else(|| {
                EvalError::empty_input(format!(
                    "Run {} captured poses but none were given",
                    config.label()
                ))
            })?;
            let aligned = alignment::apply(&self.to_ground_truth, poses);
            results.pose_errors = PoseErrorEvaluator::new(&self.ground_truth).evaluate(&aligned)?;
        }

        if config.capture_frames {
            match frames {
                Some(_) if self.ground_truth_frames.is_empty() => {
                    warn!("No reference frames, skipping the frames of run {}", config.label())
                }
                Some(frames) => {
                    let pairs = FrameMatcher::new(self.params.matching)
                        .match_frames(frames, &self.ground_truth_frames)?;
                    results.frame_distances = self.frame_evaluator.evaluate(&pairs)?;
                }
                None => warn!("Run {} captured frames but none were given", config.label()),
            }
        }

        info!(
            "Run {}: {} pose errors, {} frame distances",
            config.label(),
            results.pose_errors.len(),
            results.frame_distances.len()
        );
        Ok(results)
    }
}
