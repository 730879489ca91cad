use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use ndarray::Array2;
use rand::Rng;

use crate::{error::EvalError, image::IntoLumaImage};

/// Writes a randomly sampled subset of similarity maps to disk for inspection.
#[derive(Debug, Clone)]
pub(crate) struct DiagnosticSampler {
    probability: f64,
    dir: PathBuf,
}

impl DiagnosticSampler {
    pub fn new(probability: f64, dir: &Path) -> Self {
        Self {
            probability: num::clamp(probability, 0.0, 1.0),
            dir: dir.to_path_buf(),
        }
    }

    pub fn should_sample(&self) -> bool {
        self.probability > 0.0 && rand::thread_rng().gen_bool(self.probability)
    }

    /// Saves `map` as a PNG and appends an entry to `output.log`.
    ///
    /// # Returns
    ///
    /// Path of the written picture.
    pub fn record(
        &self,
        estimated: &str,
        ground_truth: &str,
        map: &Array2<f64>,
        ssim: f64,
    ) -> Result<PathBuf, EvalError> {
        fs::create_dir_all(&self.dir)?;

        let picture = self
            .dir
            .join(format!("{:032x}.png", rand::thread_rng().gen::<u128>()));
        map.to_luma_image().save(&picture)?;

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("output.log"))?;
        writeln!(
            log,
            "ssim\n{}\n{}\n{}\n{}\n",
            estimated,
            ground_truth,
            picture.display(),
            ssim
        )?;
        Ok(picture)
    }
}
