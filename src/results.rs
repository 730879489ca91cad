//! Configuration records of evaluation runs and their collected results.
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::EvalError,
    frame_distance::FrameDistanceSample,
    metrics::{ColumnSummary, ErrorSample, ErrorSummary},
    stats::Summary,
};

/// Synthetic perturbation applied to ground-truth poses.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub position_offset: f64,
    pub position_stddev: f64,
    pub orientation_offset: f64,
    pub orientation_stddev: f64,
}

impl NoiseConfig {
    fn bits(&self) -> [u64; 4] {
        [
            self.position_offset.to_bits(),
            self.position_stddev.to_bits(),
            self.orientation_offset.to_bits(),
            self.orientation_stddev.to_bits(),
        ]
    }
}

// Bitwise, so that equality stays consistent with hashing.
impl PartialEq for NoiseConfig {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for NoiseConfig {}

impl Hash for NoiseConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Knobs of an approximate tracker run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproxConfig {
    /// Number of tracked feature points.
    pub num_pts: usize,
    pub use_rk4_integration: bool,
    pub use_stereo: bool,
    pub use_klt: bool,
    pub use_timewarp: bool,
}

impl Default for ApproxConfig {
    fn default() -> Self {
        Self {
            num_pts: 150,
            use_rk4_integration: true,
            use_stereo: true,
            use_klt: true,
            use_timewarp: true,
        }
    }
}

impl ApproxConfig {
    /// The standard sweep: each variant changes a single knob from the default.
    pub fn sample() -> Vec<ApproxConfig> {
        let exact = ApproxConfig::default();
        vec![
            ApproxConfig {
                num_pts: 100,
                ..exact
            },
            ApproxConfig { num_pts: 70, ..exact },
            ApproxConfig {
                use_rk4_integration: false,
                ..exact
            },
            ApproxConfig {
                use_stereo: false,
                ..exact
            },
            ApproxConfig {
                use_klt: false,
                ..exact
            },
        ]
    }

    /// `"exact"` for the defaults, otherwise the changed knobs, e.g. `pts=100,!rk4`.
    pub fn label(&self) -> String {
        let exact = ApproxConfig::default();
        let mut changes = Vec::new();
        if self.num_pts != exact.num_pts {
            changes.push(format!("pts={}", self.num_pts));
        }
        for (enabled, name) in [
            (self.use_rk4_integration, "!rk4"),
            (self.use_stereo, "!stereo"),
            (self.use_klt, "!klt"),
            (self.use_timewarp, "!tw"),
        ] {
            if !enabled {
                changes.push(name.to_string());
            }
        }

        if changes.is_empty() {
            "exact".to_string()
        } else {
            changes.iter().join(",")
        }
    }

    /// Environment variables handed to the tracker, booleans as `1`/`0`.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let flag = |value: bool| String::from(if value { "1" } else { "0" });
        vec![
            ("num_pts".to_string(), self.num_pts.to_string()),
            (
                "use_rk4_integration".to_string(),
                flag(self.use_rk4_integration),
            ),
            ("use_stereo".to_string(), flag(self.use_stereo)),
            ("use_klt".to_string(), flag(self.use_klt)),
            ("use_timewarp".to_string(), flag(self.use_timewarp)),
        ]
    }
}

/// Describes one evaluation run.
///
/// Exactly one pose source is selected: the ground-truth lookup, an
/// approximate tracker or a noisy ground truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub capture_frames: bool,
    pub capture_poses: bool,
    pub noise: Option<NoiseConfig>,
    pub approx: Option<ApproxConfig>,
    pub gt_slam: bool,
    /// Start of the dataset playback, in nanoseconds.
    pub start_time_ns: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capture_frames: false,
            capture_poses: false,
            noise: None,
            approx: None,
            gt_slam: false,
            start_time_ns: 5_000_000_000,
        }
    }
}

impl RunConfig {
    /// Ground-truth reference run capturing both frames and poses.
    pub fn ground_truth() -> Self {
        Self {
            capture_frames: true,
            capture_poses: true,
            gt_slam: true,
            ..Default::default()
        }
    }

    /// Approximate tracker run capturing both frames and poses.
    pub fn approximate(approx: ApproxConfig) -> Self {
        Self {
            capture_frames: true,
            capture_poses: true,
            approx: Some(approx),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        let sources = [self.gt_slam, self.approx.is_some(), self.noise.is_some()]
            .iter()
            .filter(|selected| **selected)
            .count();
        if sources != 1 {
            return Err(EvalError::invalid_parameter(format!(
                "A run needs exactly one pose source, got {sources}"
            )));
        }
        Ok(())
    }

    pub fn label(&self) -> String {
        if self.gt_slam {
            "ground truth".to_string()
        } else if let Some(approx) = &self.approx {
            approx.label()
        } else if let Some(noise) = &self.noise {
            format!(
                "noise pos={}±{},ori={}±{}",
                noise.position_offset,
                noise.position_stddev,
                noise.orientation_offset,
                noise.orientation_stddev
            )
        } else {
            "unconfigured".to_string()
        }
    }
}

/// Aggregated frame distance figures of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub count: usize,
    pub ssim: ColumnSummary,
    pub mean_feature_distance: ColumnSummary,
}

/// Results of one run. Two results are equal when their configurations are.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResults {
    pub config: RunConfig,
    pub pose_errors: Vec<ErrorSample>,
    pub frame_distances: Vec<FrameDistanceSample>,
}

impl RunResults {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            pose_errors: Vec::new(),
            frame_distances: Vec::new(),
        }
    }

    /// `None` when the run produced no pose errors.
    pub fn pose_summary(&self) -> Option<ErrorSummary> {
        ErrorSummary::from_samples(&self.pose_errors).ok()
    }

    /// `None` when the run produced no frame distances.
    pub fn frame_summary(&self) -> Option<FrameSummary> {
        if self.frame_distances.is_empty() {
            return None;
        }
        let column = |value: fn(&FrameDistanceSample) -> f64| {
            let values = self.frame_distances.iter().map(value).collect::<Vec<_>>();
            let summary = Summary::from_values(&values);
            ColumnSummary {
                mean: summary.mean,
                rmse: crate::stats::rms(&values),
                median: summary.median,
                max: summary.max,
            }
        };
        Some(FrameSummary {
            count: self.frame_distances.len(),
            ssim: column(|s| s.ssim),
            mean_feature_distance: column(|s| s.mean_feature_distance),
        })
    }
}

impl PartialEq for RunResults {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
    }
}

impl Eq for RunResults {}

impl Hash for RunResults {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.config.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_approx_label() {
        assert_eq!(ApproxConfig::default().label(), "exact");
        assert_eq!(
            ApproxConfig {
                num_pts: 100,
                use_rk4_integration: false,
                ..Default::default()
            }
            .label(),
            "pts=100,!rk4"
        );
        assert_eq!(
            ApproxConfig {
                use_timewarp: false,
                ..Default::default()
            }
            .label(),
            "!tw"
        );
    }

    #[test]
    fn test_sample_changes_one_knob() {
        let labels = ApproxConfig::sample()
            .iter()
            .map(ApproxConfig::label)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["pts=100", "pts=70", "!rk4", "!stereo", "!klt"]);
    }

    #[test]
    fn test_env_vars() {
        let vars = ApproxConfig {
            use_klt: false,
            ..Default::default()
        }
        .env_vars();
        assert!(vars.contains(&("num_pts".to_string(), "150".to_string())));
        assert!(vars.contains(&("use_klt".to_string(), "0".to_string())));
        assert!(vars.contains(&("use_stereo".to_string(), "1".to_string())));
    }

    #[test]
    fn test_validate() {
        assert!(RunConfig::ground_truth().validate().is_ok());
        assert!(RunConfig::approximate(ApproxConfig::default()).validate().is_ok());
        assert!(RunConfig::default().validate().is_err());
        assert!(RunConfig {
            noise: Some(NoiseConfig::default()),
            ..RunConfig::ground_truth()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_results_identity_is_config() {
        let mut first = RunResults::new(RunConfig::ground_truth());
        first.pose_errors.push(ErrorSample {
            timestamp: 0,
            position_error: 1.0,
            orientation_error: 0.0,
        });
        let second = RunResults::new(RunConfig::ground_truth());
        let other = RunResults::new(RunConfig::approximate(ApproxConfig::default()));

        assert_eq!(first, second);
        assert_ne!(first, other);

        let set = [first, second, other].into_iter().collect::<HashSet<_>>();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_summaries() {
        let mut results = RunResults::new(RunConfig::ground_truth());
        assert!(results.pose_summary().is_none());
        assert!(results.frame_summary().is_none());

        for (i, ssim) in [0.5, 0.7, 0.9].into_iter().enumerate() {
            results.frame_distances.push(FrameDistanceSample {
                timestamp: i as i64,
                matched_gt_timestamp: i as i64,
                ssim,
                median_feature_distance: 0.1,
                mean_feature_distance: 0.2,
                max_feature_distance: 0.3,
            });
        }
        let summary = results.frame_summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.ssim.median, 0.7);
        assert_eq!(summary.ssim.max, 0.9);
        assert!((summary.mean_feature_distance.mean - 0.2).abs() < 1e-12);
    }
}
