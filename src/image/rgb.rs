use image::RgbImage;
use ndarray::Array3;

/// Conversion into an ndarray::Array3 with the [height, width, channels] shape.
pub trait IntoArray3 {
    fn into_array3(self) -> Array3<u8>;
}

impl IntoArray3 for &RgbImage {
    fn into_array3(self) -> Array3<u8> {
        let (width, height) = self.dimensions();
        Array3::from_shape_fn(
            (height as usize, width as usize, 3),
            |(row, col, channel)| self.get_pixel(col as u32, row as u32)[channel],
        )
    }
}
