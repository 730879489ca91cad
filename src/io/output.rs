use std::path::Path;

use serde::Serialize;

use crate::{error::EvalError, frame_distance::FrameDistanceSample, metrics::ErrorSample};

fn write_table<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<(), EvalError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `timestamp, position_error, orientation_error` rows.
pub fn write_error_table<P: AsRef<Path>>(path: P, samples: &[ErrorSample]) -> Result<(), EvalError> {
    write_table(path, samples)
}

/// Writes `timestamp, matched_gt_timestamp, ssim, median_feature_distance,
/// mean_feature_distance, max_feature_distance` rows.
pub fn write_frame_distance_table<P: AsRef<Path>>(
    path: P,
    samples: &[FrameDistanceSample],
) -> Result<(), EvalError> {
    write_table(path, samples)
}
