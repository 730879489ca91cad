//! Reading of trajectory and frame tables, writing of result tables.
mod frame_table;
mod output;
mod pose_table;

pub use frame_table::read_frame_table;
pub use output::{write_error_table, write_frame_distance_table};
pub use pose_table::{
    read_euroc_groundtruth, read_pose_table, read_tum_trajectory, INPUT_UNIT_TOLERANCE,
};

use csv::StringRecord;

use crate::error::EvalError;

/// Index of the first header matching one of `names`.
fn find_column(headers: &StringRecord, names: &[&str]) -> Result<usize, EvalError> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|header| header.trim() == *name))
        .ok_or_else(|| EvalError::ingestion(format!("Missing column {}", names.join(" or "))))
}

/// Rounds a float to the nearest `i64`, `None` when not finite or out of range.
fn round_to_i64(value: f64) -> Option<i64> {
    // 2^63, exactly representable.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let value = value.round();
    (value.is_finite() && value >= -LIMIT && value < LIMIT).then_some(value as i64)
}

/// Parses an integer nanosecond timestamp. Decimal values are rounded.
fn parse_timestamp(field: &str) -> Result<i64, EvalError> {
    let field = field.trim();
    if let Ok(value) = field.parse::<i64>() {
        return Ok(value);
    }
    field
        .parse::<f64>()
        .ok()
        .and_then(round_to_i64)
        .ok_or_else(|| EvalError::ingestion(format!("Invalid timestamp {field:?}")))
}

fn parse_f64(field: &str) -> Result<f64, EvalError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| EvalError::ingestion(format!("Invalid number {:?}", field.trim())))
}
