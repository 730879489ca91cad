use image::GrayImage;
use ndarray::{Array2, ArrayView3};

/// Trait to convert an ndarray::Array* to an image::GrayImage
pub trait IntoLumaImage {
    fn to_luma_image(&self) -> GrayImage;
}

impl IntoLumaImage for Array2<f64> {
    /// Stretches the values linearly so that the minimum maps to 0 and the
    /// maximum to 255. A constant map becomes black.
    fn to_luma_image(&self) -> GrayImage {
        let (height, width) = self.dim();
        let (min, max) = self
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
                (min.min(*v), max.max(*v))
            });
        let range = max - min;

        GrayImage::from_fn(width as u32, height as u32, |x, y| {
            let value = self[(y as usize, x as usize)];
            let scaled = if range > 0.0 && value.is_finite() {
                (value - min) / range * 255.0
            } else {
                0.0
            };
            image::Luma([num::clamp(scaled, 0.0, 255.0) as u8])
        })
    }
}

pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> f32 {
    const DIV: f32 = 1.0 / 255.0;
    (r as f32 * 0.3 + g as f32 * 0.59 + b as f32 * 0.11) * DIV
}

pub trait IntoLumaArray<T> {
    fn to_luma_array(&self) -> Array2<T>;
}

impl IntoLumaArray<f32> for ArrayView3<'_, u8> {
    /// Expects the [height, width, channels] layout. Single channel images are
    /// taken as already grayscale.
    fn to_luma_array(&self) -> Array2<f32> {
        let (height, width, channels) = self.dim();
        Array2::from_shape_fn((height, width), |(row, col)| {
            if channels >= 3 {
                rgb_to_luma(
                    self[[row, col, 0]],
                    self[[row, col, 1]],
                    self[[row, col, 2]],
                )
            } else {
                self[[row, col, 0]] as f32 / 255.0
            }
        })
    }
}
