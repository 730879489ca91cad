//! Keypoint extraction and descriptor matching backed by OpenCV.
use ndarray::{Array2, ArrayView2};
use opencv::{
    core::{DMatch, KeyPoint, Mat, Vector, NORM_HAMMING, NORM_L2},
    features2d::{self, BFMatcher},
    prelude::*,
};

use super::{DescriptorMatch, DescriptorMatcher, FeatureExtractor, Features, Keypoint};
use crate::error::EvalError;

const ORB_DESCRIPTOR_BYTES: usize = 32;

fn luma_to_mat(luma: &ArrayView2<f32>) -> Result<Mat, EvalError> {
    let rows = luma
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .map(|v| (num::clamp(*v, 0.0, 1.0) * 255.0).round() as u8)
                .collect::<Vec<u8>>()
        })
        .collect::<Vec<_>>();
    Ok(Mat::from_slice_2d(&rows)?)
}

/// ORB keypoints with their binary descriptors.
///
/// Each descriptor byte is stored as one `f32` column, so they must be matched
/// with [`OpenCvMatcher::hamming`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbExtractor {
    pub max_features: usize,
    /// Pyramid decimation ratio.
    pub scale_factor: f32,
    /// Pyramid levels.
    pub levels: i32,
    /// FAST threshold.
    pub fast_threshold: i32,
}

impl Default for OrbExtractor {
    fn default() -> Self {
        Self {
            max_features: 500,
            scale_factor: 1.2,
            levels: 8,
            fast_threshold: 20,
        }
    }
}

impl OrbExtractor {
    pub fn max_features(&'_ mut self, value: usize) -> &'_ mut OrbExtractor {
        self.max_features = value;
        self
    }
}

impl FeatureExtractor for OrbExtractor {
    fn detect_and_compute(&self, luma: &ArrayView2<f32>) -> Result<Features, EvalError> {
        let empty = || Features {
            keypoints: Vec::new(),
            descriptors: Array2::zeros((0, ORB_DESCRIPTOR_BYTES)),
        };
        let (height, width) = luma.dim();
        if height == 0 || width == 0 {
            return Ok(empty());
        }

        let image = luma_to_mat(luma)?;
        let mut orb = features2d::ORB::create(
            self.max_features as i32,
            self.scale_factor,
            self.levels,
            31,
            0,
            2,
            features2d::ORB_ScoreType::HARRIS_SCORE,
            31,
            self.fast_threshold,
        )?;
        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        orb.detect_and_compute(&image, &Mat::default(), &mut keypoints, &mut descriptors, false)?;
        if keypoints.is_empty() || descriptors.rows() == 0 {
            return Ok(empty());
        }

        let mut array = Array2::<f32>::zeros((descriptors.rows() as usize, descriptors.cols() as usize));
        for ((row, col), value) in array.indexed_iter_mut() {
            *value = f32::from(*descriptors.at_2d::<u8>(row as i32, col as i32)?);
        }

        Ok(Features {
            keypoints: keypoints
                .iter()
                .map(|keypoint| Keypoint {
                    row: keypoint.pt().y.round().max(0.0) as usize,
                    col: keypoint.pt().x.round().max(0.0) as usize,
                    response: keypoint.response(),
                })
                .collect(),
            descriptors: array,
        })
    }
}

/// OpenCV brute-force matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenCvMatcher {
    /// `NORM_HAMMING` for binary descriptors, `NORM_L2` for float ones.
    pub norm_type: i32,
    pub cross_check: bool,
}

impl Default for OpenCvMatcher {
    fn default() -> Self {
        Self::hamming()
    }
}

impl OpenCvMatcher {
    pub fn hamming() -> Self {
        Self {
            norm_type: NORM_HAMMING,
            cross_check: true,
        }
    }

    pub fn l2() -> Self {
        Self {
            norm_type: NORM_L2,
            cross_check: true,
        }
    }

    fn to_mat(&self, descriptors: &ArrayView2<f32>) -> Result<Mat, EvalError> {
        let mat = if self.norm_type == NORM_HAMMING {
            let rows = descriptors
                .rows()
                .into_iter()
                .map(|row| {
                    row.iter()
                        .map(|v| num::clamp(*v, 0.0, 255.0) as u8)
                        .collect::<Vec<u8>>()
                })
                .collect::<Vec<_>>();
            Mat::from_slice_2d(&rows)?
        } else {
            let rows = descriptors
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect::<Vec<Vec<f32>>>();
            Mat::from_slice_2d(&rows)?
        };
        Ok(mat)
    }
}

impl DescriptorMatcher for OpenCvMatcher {
    fn match_descriptors(
        &self,
        query: &ArrayView2<f32>,
        train: &ArrayView2<f32>,
    ) -> Result<Vec<DescriptorMatch>, EvalError> {
        if query.ncols() != train.ncols() {
            return Err(EvalError::invalid_parameter(format!(
                "Descriptors of size {} and {} cannot be matched",
                query.ncols(),
                train.ncols()
            )));
        }
        if query.nrows() == 0 || train.nrows() == 0 {
            return Ok(Vec::new());
        }

        let matcher = BFMatcher::new(self.norm_type, self.cross_check)?;
        let mut matches = Vector::<DMatch>::new();
        matcher.train_match(
            &self.to_mat(query)?,
            &self.to_mat(train)?,
            &mut matches,
            &Mat::default(),
        )?;

        Ok(matches
            .iter()
            .map(|m| DescriptorMatch {
                query_index: m.query_idx as usize,
                train_index: m.train_idx as usize,
                distance: m.distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use ndarray::array;

    use super::*;
    use crate::{
        frame_distance::feature_distance,
        image::{IntoArray3, IntoLumaArray},
    };

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x / 20 + y / 20) % 2 == 0 {
                Rgb([30, 60, 90])
            } else {
                Rgb([220, 200, 180])
            }
        })
    }

    #[test]
    fn test_orb_features() {
        let image = checker(200, 160);
        let luma = (&image).into_array3().view().to_luma_array();
        let features = OrbExtractor::default().detect_and_compute(&luma.view()).unwrap();

        assert!(!features.is_empty());
        assert_eq!(features.descriptors.dim(), (features.len(), ORB_DESCRIPTOR_BYTES));
        for keypoint in features.keypoints.iter() {
            assert!(keypoint.row < 160 && keypoint.col < 200);
        }
    }

    #[test]
    fn test_identical_images_have_zero_distance() {
        let image = checker(200, 160);
        let summary = feature_distance(
            &OrbExtractor::default(),
            &OpenCvMatcher::hamming(),
            &image,
            &image,
        )
        .unwrap();
        assert_eq!(summary.max, 0.0);
    }

    #[test]
    fn test_flat_image_has_no_features() {
        let luma = Array2::<f32>::from_elem((120, 120), 0.5);
        let features = OrbExtractor::default().detect_and_compute(&luma.view()).unwrap();
        assert!(features.is_empty());
        assert_eq!(features.descriptors.ncols(), ORB_DESCRIPTOR_BYTES);
    }

    #[test]
    fn test_l2_matcher() {
        let query = array![[0.0f32, 0.0], [5.0, 5.0]];
        let train = array![[5.0f32, 5.0], [0.0, 0.1]];
        let mut matches = OpenCvMatcher::l2()
            .match_descriptors(&query.view(), &train.view())
            .unwrap();
        matches.sort_by_key(|m| m.query_index);

        assert_eq!(
            matches.iter().map(|m| m.train_index).collect::<Vec<_>>(),
            vec![1, 0]
        );
        assert!((matches[0].distance - 0.1).abs() < 1e-6);
        assert_eq!(matches[1].distance, 0.0);
    }

    #[test]
    fn test_hamming_matcher() {
        let query = array![[255.0f32, 0.0]];
        let train = array![[255.0f32, 3.0]];
        let matches = OpenCvMatcher::hamming()
            .match_descriptors(&query.view(), &train.view())
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].distance, 2.0);

        let empty = Array2::<f32>::zeros((0, 2));
        assert!(OpenCvMatcher::hamming()
            .match_descriptors(&empty.view(), &train.view())
            .unwrap()
            .is_empty());
    }
}
