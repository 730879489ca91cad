mod rgb;
pub use rgb::IntoArray3;

mod luma;
pub use luma::{rgb_to_luma, IntoLumaArray, IntoLumaImage};

mod handle;
pub use handle::ImageHandle;

mod ssim;
pub use ssim::{ImageSimilarity, Ssim};

mod features;
pub use features::{FeatureExtractor, Features, HarrisPatchExtractor, Keypoint};

mod matching;
pub use matching::{BruteForceMatcher, DescriptorMatch, DescriptorMatcher};

#[cfg(feature = "opencv")]
mod opencv_features;
#[cfg(feature = "opencv")]
pub use opencv_features::{OpenCvMatcher, OrbExtractor};
