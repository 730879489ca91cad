use image::{Rgb, RgbImage};
use rstest::fixture;

/// 64x48 checkerboard of 8 pixel squares in two colors.
#[fixture]
pub fn checker_rgb() -> RgbImage {
    RgbImage::from_fn(64, 48, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([30, 60, 90])
        } else {
            Rgb([220, 200, 180])
        }
    })
}

/// 64x48 smooth color ramp.
#[fixture]
pub fn gradient_rgb() -> RgbImage {
    RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
    })
}
