use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::info;

use super::{find_column, parse_timestamp};
use crate::{
    error::EvalError,
    frames::{FrameRecord, FrameStream},
};

/// Reads a frame table written by a frame logger.
///
/// Columns are `frame_no` and `dataset_time` (or `timestamp`), with an
/// optional `path`. Without a path column, frame `n` is `<frame_dir>/<n>.png`.
/// Relative paths are resolved against `frame_dir`.
///
/// # Arguments
///
/// * `path` - CSV file path.
/// * `frame_dir` - Directory holding the frame pictures.
pub fn read_frame_table<P: AsRef<Path>, D: AsRef<Path>>(
    path: P,
    frame_dir: D,
) -> Result<FrameStream<PathBuf>, EvalError> {
    let frame_dir = frame_dir.as_ref();
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let time_column = find_column(&headers, &["dataset_time", "timestamp"])?;
    let frame_column = find_column(&headers, &["frame_no"]).ok();
    let path_column = find_column(&headers, &["path", "frame_path"]).ok();
    if frame_column.is_none() && path_column.is_none() {
        return Err(EvalError::ingestion(
            "A frame table needs a frame_no or a path column",
        ));
    }

    let mut frames = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |index: usize| {
            record.get(index).ok_or_else(|| {
                EvalError::ingestion(format!("Row {:?} is too short", record.position()))
            })
        };

        let timestamp = parse_timestamp(field(time_column)?)?;
        let image = match (path_column, frame_column) {
            (Some(column), _) => frame_dir.join(field(column)?),
            (None, Some(column)) => {
                let frame_no = field(column)?.parse::<u64>().map_err(|_| {
                    EvalError::ingestion(format!("Invalid frame number {:?}", record.get(column)))
                })?;
                frame_dir.join(format!("{frame_no}.png"))
            }
            (None, None) => {
                return Err(EvalError::ingestion(
                    "A frame table needs a frame_no or a path column",
                ))
            }
        };
        frames.push(FrameRecord::new(timestamp, image));
    }

    info!("Read {} frames from {}", frames.len(), path.as_ref().display());
    FrameStream::new(frames)
}
