use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord};
use log::info;
use nalgebra::{Quaternion, Vector3};

use super::{find_column, parse_f64, parse_timestamp, round_to_i64};
use crate::{
    error::EvalError,
    trajectory::{Pose, PoseStream},
};

const POSE_COLUMNS: [&str; 7] = [
    "position_x",
    "position_y",
    "position_z",
    "orientation_w",
    "orientation_x",
    "orientation_y",
    "orientation_z",
];

/// Norm tolerance of quaternions read from text. Files commonly print them with
/// four to six decimals, they are renormalized before building the pose.
pub const INPUT_UNIT_TOLERANCE: f64 = 1e-3;

/// Builds a pose from a timestamp followed by x, y, z, qw, qx, qy, qz.
fn pose_from_values(timestamp: i64, v: &[f64; 7]) -> Result<Pose, EvalError> {
    let orientation = Quaternion::new(v[3], v[4], v[5], v[6]);
    let norm = orientation.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > INPUT_UNIT_TOLERANCE {
        return Err(EvalError::ingestion(format!(
            "Pose at {timestamp} has a non-unit orientation (norm = {norm})"
        )));
    }
    Pose::new(timestamp, Vector3::new(v[0], v[1], v[2]), orientation / norm)
}

fn pose_from_record(
    record: &StringRecord,
    time_column: usize,
    columns: &[usize; 7],
) -> Result<Pose, EvalError> {
    let field = |index: usize| {
        record
            .get(index)
            .ok_or_else(|| EvalError::ingestion(format!("Row {:?} is too short", record.position())))
    };

    let timestamp = parse_timestamp(field(time_column)?)?;
    let mut values = [0.0; 7];
    for (value, column) in values.iter_mut().zip(columns) {
        *value = parse_f64(field(*column)?)?;
    }
    pose_from_values(timestamp, &values)
}

/// Reads a pose table with a header row.
///
/// The timestamp column is `timestamp` or, for tracker logs, `dataset_time`.
/// Other columns such as `frame_no` are ignored.
///
/// # Arguments
///
/// * `path` - CSV file path.
///
/// # Returns
///
/// The stream, or an ingestion error on missing columns, malformed values or
/// timestamps that are not strictly increasing.
pub fn read_pose_table<P: AsRef<Path>>(path: P) -> Result<PoseStream, EvalError> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let time_column = find_column(&headers, &["timestamp", "dataset_time"])?;
    let mut columns = [0; 7];
    for (column, name) in columns.iter_mut().zip(POSE_COLUMNS) {
        *column = find_column(&headers, &[name])?;
    }

    let poses = reader
        .records()
        .map(|record| pose_from_record(&record?, time_column, &columns))
        .collect::<Result<Vec<_>, EvalError>>()?;

    info!("Read {} poses from {}", poses.len(), path.as_ref().display());
    PoseStream::new(poses)
}

/// Reads an EuRoC `state_groundtruth_estimate0/data.csv` file.
///
/// Only the first eight columns are used: timestamp, position and the w-first
/// orientation. Lines starting with `#` are skipped.
pub fn read_euroc_groundtruth<P: AsRef<Path>>(path: P) -> Result<PoseStream, EvalError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let columns = [1, 2, 3, 4, 5, 6, 7];
    let poses = reader
        .records()
        .map(|record| pose_from_record(&record?, 0, &columns))
        .collect::<Result<Vec<_>, EvalError>>()?;

    info!(
        "Read {} ground truth poses from {}",
        poses.len(),
        path.as_ref().display()
    );
    PoseStream::new(poses)
}

/// Converts decimal seconds to integer nanoseconds without going through a
/// float, digits past the nanosecond are truncated.
fn seconds_to_ns(token: &str) -> Result<i64, EvalError> {
    let invalid = || EvalError::ingestion(format!("Invalid time {token:?}"));

    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        // Exponent notation and the like.
        let seconds = token.parse::<f64>().map_err(|_| invalid())?;
        return round_to_i64(seconds * 1e9).ok_or_else(invalid);
    }

    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().map_err(|_| invalid())?
    };
    let nanos = format!("{:0<9}", &fraction[..fraction.len().min(9)])
        .parse::<i64>()
        .map_err(|_| invalid())?;
    let total = whole
        .checked_mul(1_000_000_000)
        .and_then(|ns| ns.checked_add(nanos))
        .ok_or_else(invalid)?;
    Ok(if negative { -total } else { total })
}

/// Reads a TUM trajectory: `time tx ty tz qx qy qz qw` per line, time in
/// seconds, `#` comments.
pub fn read_tum_trajectory<P: AsRef<Path>>(path: P) -> Result<PoseStream, EvalError> {
    let reader = BufReader::new(File::open(path.as_ref())?);

    let mut poses = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < 8 {
            return Err(EvalError::ingestion(format!(
                "Line {} has {} fields, expected 8",
                number + 1,
                tokens.len()
            )));
        }
        let timestamp = seconds_to_ns(tokens[0])?;
        let mut v = [0.0; 7];
        for (value, token) in v.iter_mut().zip(&tokens[1..8]) {
            *value = parse_f64(token)?;
        }
        // TUM stores the quaternion w last.
        poses.push(pose_from_values(
            timestamp,
            &[v[0], v[1], v[2], v[6], v[3], v[4], v[5]],
        )?);
    }

    info!("Read {} poses from {}", poses.len(), path.as_ref().display());
    PoseStream::new(poses)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_abs_diff_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_pose_table() {
        let file = temp_file(
            "timestamp,position_x,position_y,position_z,orientation_w,orientation_x,orientation_y,orientation_z\n\
             0,1.0,2.0,3.0,1.0,0.0,0.0,0.0\n\
             10,1.5,2.0,3.0,0.0,0.0,0.0,1.0\n",
        );
        let stream = read_pose_table(file.path()).unwrap();
        assert_eq!(stream.timestamps(), vec![0, 10]);
        assert_eq!(stream[1].position, Vector3::new(1.5, 2.0, 3.0));
        assert_abs_diff_eq!(stream[1].orientation.k, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_read_tracker_log() {
        let file = temp_file(
            "frame_no,dataset_time,position_x,position_y,position_z,orientation_w,orientation_x,orientation_y,orientation_z\n\
             0,5000000000,0,0,0,1,0,0,0\n\
             1,5033333333,0,0,0.1,1,0,0,0\n",
        );
        let stream = read_pose_table(file.path()).unwrap();
        assert_eq!(stream.timestamps(), vec![5_000_000_000, 5_033_333_333]);
    }

    #[test]
    fn test_reject_bad_tables() {
        let header = "timestamp,position_x,position_y,position_z,orientation_w,orientation_x,orientation_y,orientation_z\n";
        let duplicate = temp_file(&format!("{header}0,0,0,0,1,0,0,0\n0,0,0,0,1,0,0,0\n"));
        assert!(matches!(
            read_pose_table(duplicate.path()),
            Err(EvalError::Ingestion(_))
        ));

        let decreasing = temp_file(&format!("{header}5,0,0,0,1,0,0,0\n2,0,0,0,1,0,0,0\n"));
        assert!(matches!(
            read_pose_table(decreasing.path()),
            Err(EvalError::Ingestion(_))
        ));

        let malformed = temp_file(&format!("{header}0,0,zero,0,1,0,0,0\n"));
        assert!(matches!(
            read_pose_table(malformed.path()),
            Err(EvalError::Ingestion(_))
        ));

        let missing = temp_file("timestamp,position_x\n0,1\n");
        assert!(matches!(
            read_pose_table(missing.path()),
            Err(EvalError::Ingestion(_))
        ));
    }

    #[test]
    fn test_reject_non_unit_orientation() {
        let file = temp_file(
            "timestamp,position_x,position_y,position_z,orientation_w,orientation_x,orientation_y,orientation_z\n\
             0,0,0,0,1.0,0.1,0.0,0.0\n",
        );
        assert!(matches!(
            read_pose_table(file.path()),
            Err(EvalError::Ingestion(_))
        ));
    }

    #[test]
    fn test_read_euroc_groundtruth() {
        let file = temp_file(
            "#timestamp, p_RS_R_x [m], p_RS_R_y [m], p_RS_R_z [m], q_RS_w [], q_RS_x [], q_RS_y [], q_RS_z [], v_RS_R_x [m s^-1]\n\
             1403636579758555392,4.688319,-1.786938,0.783338,0.534108,-0.153029,-0.827383,-0.082152,-0.027876\n\
             1403636579763555584,4.688177,-1.786770,0.787350,0.534640,-0.152990,-0.826976,-0.082863,-0.029272\n",
        );
        let stream = read_euroc_groundtruth(file.path()).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].timestamp, 1403636579758555392);
        assert_abs_diff_eq!(stream[0].position.x, 4.688319, epsilon = 1e-12);
        assert_abs_diff_eq!(stream[0].orientation.w, 0.534108, epsilon = 1e-5);
    }

    #[test]
    fn test_seconds_to_ns() {
        assert_eq!(seconds_to_ns("1305031102.175304").unwrap(), 1305031102175304000);
        assert_eq!(seconds_to_ns("12").unwrap(), 12_000_000_000);
        assert_eq!(seconds_to_ns(".5").unwrap(), 500_000_000);
        assert_eq!(seconds_to_ns("-1.25").unwrap(), -1_250_000_000);
        assert_eq!(seconds_to_ns("1.0000000019").unwrap(), 1_000_000_001);
        assert_eq!(seconds_to_ns("1e-3").unwrap(), 1_000_000);
        assert!(seconds_to_ns("1e10").is_err());
        assert!(seconds_to_ns(".").is_err());
        assert!(seconds_to_ns("x").is_err());
    }

    #[test]
    fn test_read_tum_trajectory() {
        let file = temp_file(
            "# ground truth trajectory\n\
             # timestamp tx ty tz qx qy qz qw\n\
             1305031098.6659 1.3563 0.6305 1.6380 0.6132 0.5962 -0.3311 -0.3986\n\
             1305031098.6758 1.3543 0.6306 1.6360 0.6129 0.5966 -0.3316 -0.3980\n",
        );
        let stream = read_tum_trajectory(file.path()).unwrap();
        assert_eq!(stream.timestamps(), vec![1305031098665900000, 1305031098675800000]);
        assert_abs_diff_eq!(stream[0].orientation.w, -0.3986, epsilon = 1e-3);
        assert_abs_diff_eq!(stream[0].orientation.i, 0.6132, epsilon = 1e-3);
    }
}
