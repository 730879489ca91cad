use image::RgbImage;
use ndarray::{s, Array2, ArrayView2, Axis};

use super::rgb::IntoArray3;
use crate::error::EvalError;

/// Perceptual similarity between two images of the same shape.
///
/// Implementations must be symmetric and return 1.0 for identical images.
pub trait ImageSimilarity: Sync {
    fn similarity(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<f64, EvalError>;

    /// Per-location similarity, used to render diagnostic pictures.
    fn similarity_map(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<Array2<f64>, EvalError>;
}

/// Summed area table for constant time box sums.
struct SummedArea(Array2<f64>);

impl SummedArea {
    fn new<F: Fn(usize, usize) -> f64>(height: usize, width: usize, value: F) -> Self {
        let mut table = Array2::<f64>::zeros((height + 1, width + 1));
        for row in 0..height {
            let mut row_sum = 0.0;
            for col in 0..width {
                row_sum += value(row, col);
                table[(row + 1, col + 1)] = table[(row, col + 1)] + row_sum;
            }
        }
        Self(table)
    }

    /// Sum of the `size`x`size` box whose top-left corner is `(row, col)`.
    fn box_sum(&self, row: usize, col: usize, size: usize) -> f64 {
        let t = &self.0;
        t[(row + size, col + size)] - t[(row, col + size)] - t[(row + size, col)] + t[(row, col)]
    }
}

/// Structural similarity index with a uniform square window.
///
/// The score is the mean of the local SSIM over every window position that
/// lies inside the image, averaged across the color channels. Local variances
/// use the sample (N - 1) normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ssim {
    /// Side of the window, odd. Shrinks to fit smaller images.
    pub window_size: usize,
    pub k1: f64,
    pub k2: f64,
    /// Dynamic range of the pixel values.
    pub data_range: f64,
}

impl Default for Ssim {
    fn default() -> Self {
        Self {
            window_size: 7,
            k1: 0.01,
            k2: 0.03,
            data_range: 255.0,
        }
    }
}

impl Ssim {
    fn effective_window(&self, height: usize, width: usize) -> Result<usize, EvalError> {
        let window = self.window_size.min(height).min(width);
        if window < 3 {
            return Err(EvalError::invalid_parameter(format!(
                "Window {} does not fit images of {width}x{height}",
                self.window_size
            )));
        }
        Ok(if window % 2 == 0 { window - 1 } else { window })
    }

    /// Local SSIM of one channel for every window position.
    fn channel_map(&self, x: &ArrayView2<f64>, y: &ArrayView2<f64>, window: usize) -> Array2<f64> {
        let (height, width) = x.dim();
        let sum_x = SummedArea::new(height, width, |r, c| x[(r, c)]);
        let sum_y = SummedArea::new(height, width, |r, c| y[(r, c)]);
        let sum_xx = SummedArea::new(height, width, |r, c| x[(r, c)] * x[(r, c)]);
        let sum_yy = SummedArea::new(height, width, |r, c| y[(r, c)] * y[(r, c)]);
        let sum_xy = SummedArea::new(height, width, |r, c| x[(r, c)] * y[(r, c)]);

        let count = (window * window) as f64;
        let cov_norm = count / (count - 1.0);
        let c1 = (self.k1 * self.data_range).powi(2);
        let c2 = (self.k2 * self.data_range).powi(2);

        Array2::from_shape_fn(
            (height - window + 1, width - window + 1),
            |(row, col)| {
                let ux = sum_x.box_sum(row, col, window) / count;
                let uy = sum_y.box_sum(row, col, window) / count;
                let uxx = sum_xx.box_sum(row, col, window) / count;
                let uyy = sum_yy.box_sum(row, col, window) / count;
                let uxy = sum_xy.box_sum(row, col, window) / count;

                let vx = cov_norm * (uxx - ux * ux);
                let vy = cov_norm * (uyy - uy * uy);
                let vxy = cov_norm * (uxy - ux * uy);

                let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
                let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
                numerator / denominator
            },
        )
    }

    /// SSIM map averaged over the channels.
    pub fn compute_map(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<Array2<f64>, EvalError> {
        if lhs.dimensions() != rhs.dimensions() {
            return Err(EvalError::invalid_parameter(format!(
                "SSIM needs images of the same shape, got {:?} and {:?}",
                lhs.dimensions(),
                rhs.dimensions()
            )));
        }

        let lhs = lhs.into_array3().mapv(f64::from);
        let rhs = rhs.into_array3().mapv(f64::from);
        let (height, width, channels) = lhs.dim();
        let window = self.effective_window(height, width)?;

        let mut map = Array2::<f64>::zeros((height - window + 1, width - window + 1));
        for channel in 0..channels {
            map += &self.channel_map(
                &lhs.slice(s![.., .., channel]),
                &rhs.slice(s![.., .., channel]),
                window,
            );
        }
        map /= channels as f64;
        Ok(map)
    }

    /// Mean SSIM, the per channel means averaged.
    pub fn compute(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<f64, EvalError> {
        let map = self.compute_map(lhs, rhs)?;
        Ok(map
            .mean_axis(Axis(0))
            .and_then(|row_means| row_means.mean())
            .unwrap_or(0.0))
    }
}

impl ImageSimilarity for Ssim {
    fn similarity(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<f64, EvalError> {
        self.compute(lhs, rhs)
    }

    fn similarity_map(&self, lhs: &RgbImage, rhs: &RgbImage) -> Result<Array2<f64>, EvalError> {
        self.compute_map(lhs, rhs)
    }
}
