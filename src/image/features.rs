use ndarray::{s, Array2, ArrayView2};
use ordered_float::OrderedFloat;

use crate::error::EvalError;

/// Detected image location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub row: usize,
    pub col: usize,
    /// Detector score, larger is stronger.
    pub response: f32,
}

/// Keypoints with one descriptor row per keypoint.
#[derive(Clone, Debug)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    /// Shape: [num_keypoints, descriptor_size].
    pub descriptors: Array2<f32>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Detects keypoints and computes their descriptors on a grayscale image.
pub trait FeatureExtractor: Sync {
    /// # Arguments
    ///
    /// * `luma` - Intensities in the [0, 1] range, shape [height, width].
    fn detect_and_compute(&self, luma: &ArrayView2<f32>) -> Result<Features, EvalError>;
}

/// Harris corners described by their normalized intensity patch.
///
/// Descriptors are zero mean and unit length, so the L2 distance between two of
/// them lies in [0, 2].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarrisPatchExtractor {
    /// Maximum number of keypoints kept, strongest first.
    pub max_features: usize,
    /// Harris sensitivity constant.
    pub harris_k: f32,
    /// Minimum response relative to the strongest one.
    pub relative_threshold: f32,
    /// Half side of the descriptor patch.
    pub patch_radius: usize,
    /// Half side of the non-maximum suppression window.
    pub nms_radius: usize,
}

impl Default for HarrisPatchExtractor {
    fn default() -> Self {
        Self {
            max_features: 500,
            harris_k: 0.04,
            relative_threshold: 0.01,
            patch_radius: 4,
            nms_radius: 3,
        }
    }
}

impl HarrisPatchExtractor {
    pub fn max_features(&'_ mut self, value: usize) -> &'_ mut HarrisPatchExtractor {
        self.max_features = value;
        self
    }

    pub fn descriptor_size(&self) -> usize {
        let side = 2 * self.patch_radius + 1;
        side * side
    }

    /// Harris corner response, zero at the one pixel border.
    pub fn response(&self, luma: &ArrayView2<f32>) -> Array2<f32> {
        let (height, width) = luma.dim();
        let mut response = Array2::<f32>::zeros((height, width));
        if height < 5 || width < 5 {
            return response;
        }

        let mut grad_xx = Array2::<f32>::zeros((height, width));
        let mut grad_yy = Array2::<f32>::zeros((height, width));
        let mut grad_xy = Array2::<f32>::zeros((height, width));
        for row in 1..height - 1 {
            for col in 1..width - 1 {
                let gx = (luma[(row, col + 1)] - luma[(row, col - 1)]) * 0.5;
                let gy = (luma[(row + 1, col)] - luma[(row - 1, col)]) * 0.5;
                grad_xx[(row, col)] = gx * gx;
                grad_yy[(row, col)] = gy * gy;
                grad_xy[(row, col)] = gx * gy;
            }
        }

        for row in 2..height - 2 {
            for col in 2..width - 2 {
                let window = s![row - 1..row + 2, col - 1..col + 2];
                let sxx = grad_xx.slice(window).sum();
                let syy = grad_yy.slice(window).sum();
                let sxy = grad_xy.slice(window).sum();
                let trace = sxx + syy;
                response[(row, col)] = sxx * syy - sxy * sxy - self.harris_k * trace * trace;
            }
        }
        response
    }

    fn is_local_max(&self, response: &Array2<f32>, row: usize, col: usize) -> bool {
        let (height, width) = response.dim();
        let value = response[(row, col)];
        let r = self.nms_radius;
        for nrow in row.saturating_sub(r)..(row + r + 1).min(height) {
            for ncol in col.saturating_sub(r)..(col + r + 1).min(width) {
                let other = response[(nrow, ncol)];
                // Equal neighbors: only the first in raster order survives.
                if other > value || (other == value && (nrow, ncol) < (row, col)) {
                    return false;
                }
            }
        }
        true
    }

    fn describe(&self, luma: &ArrayView2<f32>, keypoint: &Keypoint) -> Vec<f32> {
        let r = self.patch_radius;
        let patch = luma.slice(s![
            keypoint.row - r..keypoint.row + r + 1,
            keypoint.col - r..keypoint.col + r + 1
        ]);
        let mean = patch.mean().unwrap_or(0.0);
        let centered = patch.iter().map(|v| v - mean).collect::<Vec<f32>>();
        let norm = centered.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 1e-6 {
            centered.iter().map(|v| v / norm).collect()
        } else {
            vec![0.0; centered.len()]
        }
    }
}

impl FeatureExtractor for HarrisPatchExtractor {
    fn detect_and_compute(&self, luma: &ArrayView2<f32>) -> Result<Features, EvalError> {
        let (height, width) = luma.dim();
        let border = self.patch_radius.max(2);
        let descriptor_size = self.descriptor_size();
        let empty = || Features {
            keypoints: Vec::new(),
            descriptors: Array2::zeros((0, descriptor_size)),
        };
        if height <= 2 * border || width <= 2 * border {
            return Ok(empty());
        }

        let response = self.response(luma);
        let max_response = response.iter().copied().fold(0.0f32, f32::max);
        if max_response <= 0.0 {
            return Ok(empty());
        }
        let threshold = max_response * self.relative_threshold;

        let mut keypoints = Vec::new();
        for row in border..height - border {
            for col in border..width - border {
                let value = response[(row, col)];
                if value > threshold && self.is_local_max(&response, row, col) {
                    keypoints.push(Keypoint {
                        row,
                        col,
                        response: value,
                    });
                }
            }
        }
        // Stable sort, ties keep raster order.
        keypoints.sort_by_key(|keypoint| std::cmp::Reverse(OrderedFloat(keypoint.response)));
        keypoints.truncate(self.max_features);

        let mut descriptors = Array2::<f32>::zeros((keypoints.len(), descriptor_size));
        for (mut row, keypoint) in descriptors.rows_mut().into_iter().zip(keypoints.iter()) {
            for (dst, src) in row.iter_mut().zip(self.describe(luma, keypoint)) {
                *dst = src;
            }
        }

        Ok(Features {
            keypoints,
            descriptors,
        })
    }
}
