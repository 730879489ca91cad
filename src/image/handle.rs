use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbImage;

use crate::error::EvalError;

/// Opaque reference to a frame's pixels.
///
/// Frames are usually kept on disk and decoded only when a pair is evaluated.
pub trait ImageHandle: Send + Sync {
    fn load(&self) -> Result<RgbImage, EvalError>;

    /// Short description used in diagnostic logs.
    fn describe(&self) -> String;
}

impl ImageHandle for PathBuf {
    fn load(&self) -> Result<RgbImage, EvalError> {
        self.as_path().load()
    }

    fn describe(&self) -> String {
        self.display().to_string()
    }
}

impl ImageHandle for &Path {
    fn load(&self) -> Result<RgbImage, EvalError> {
        Ok(image::open(self)?.into_rgb8())
    }

    fn describe(&self) -> String {
        self.display().to_string()
    }
}

impl ImageHandle for Arc<RgbImage> {
    fn load(&self) -> Result<RgbImage, EvalError> {
        Ok(self.as_ref().clone())
    }

    fn describe(&self) -> String {
        format!("<in-memory {}x{}>", self.width(), self.height())
    }
}

impl ImageHandle for RgbImage {
    fn load(&self) -> Result<RgbImage, EvalError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("<in-memory {}x{}>", self.width(), self.height())
    }
}
