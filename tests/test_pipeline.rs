use std::{fs, path::Path};

use approx::assert_abs_diff_eq;
use image::RgbImage;
use nalgebra::{UnitQuaternion, Vector3};
use rstest::*;

use trackeval::{
    alignment::{self, compute_alignment, AlignmentParams},
    executor::ExecutorKind,
    frames::FrameStream,
    io::{read_euroc_groundtruth, read_pose_table, write_error_table},
    metrics::{ErrorSummary, PoseErrorEvaluator},
    params::EvalParams,
    results::{ApproxConfig, RunConfig},
    session::EvaluationSession,
    GroundTruthTrack, PoseStream, RigidTransform,
};

/// Writes a EuRoC-like ground truth of a circle walked at 200 Hz over 4 s.
fn write_euroc(path: &Path) {
    let mut content = String::from(
        "#timestamp,p_RS_R_x [m],p_RS_R_y [m],p_RS_R_z [m],q_RS_w [],q_RS_x [],q_RS_y [],q_RS_z [],v_RS_R_x [m s^-1]\n",
    );
    for i in 0..800i64 {
        let t = i as f64 / 200.0;
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, t * 0.5);
        content.push_str(&format!(
            "{},{},{},{},{},{},{},{},0.0\n",
            5_000_000_000 + i * 5_000_000,
            t.cos(),
            t.sin(),
            1.0,
            q.w,
            q.i,
            q.j,
            q.k
        ));
    }
    fs::write(path, content).unwrap();
}

/// Writes a tracker log: the ground truth at 30 Hz expressed in a frame
/// rotated and shifted by `offset`, plus a constant drift along z.
fn write_tracker_log(path: &Path, ground_truth: &GroundTruthTrack, offset: &RigidTransform) {
    let mut content = String::from(
        "frame_no,dataset_time,position_x,position_y,position_z,orientation_w,orientation_x,orientation_y,orientation_z\n",
    );
    let (first, last) = ground_truth.time_range();
    let mut timestamp = first + 1_000_000;
    let mut frame_no = 0;
    while timestamp < last {
        let pose = offset.transform_pose(&ground_truth.pose_at(timestamp).unwrap());
        let q = pose.orientation;
        content.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            frame_no,
            timestamp,
            pose.position.x,
            pose.position.y,
            pose.position.z + 0.01,
            q.w,
            q.i,
            q.j,
            q.k
        ));
        timestamp += 33_333_333;
        frame_no += 1;
    }
    fs::write(path, content).unwrap();
}

#[fixture]
fn workspace() -> tempfile::TempDir {
    env_logger::try_init().ok();
    tempfile::tempdir().unwrap()
}

#[rstest]
fn test_poses_end_to_end(workspace: tempfile::TempDir) {
    let gt_path = workspace.path().join("data.csv");
    write_euroc(&gt_path);
    let ground_truth = GroundTruthTrack::new(read_euroc_groundtruth(&gt_path).unwrap()).unwrap();
    assert_eq!(ground_truth.poses().len(), 800);

    // The tracker frame is the ground truth turned around z and shifted.
    let to_tracker = RigidTransform::new(
        &Vector3::new(3.0, -1.0, 0.5),
        &UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7),
    );
    let poses_path = workspace.path().join("poses.csv");
    write_tracker_log(&poses_path, &ground_truth, &to_tracker);
    let estimated = read_pose_table(&poses_path).unwrap();

    // Recover the transform from the first pose and the initial heading.
    let first_gt = ground_truth.poses()[0].clone();
    let first_est = to_tracker.transform_pose(&first_gt);
    let heading = Vector3::new(0.3, 1.0, 0.0);
    let to_ground_truth = compute_alignment(
        &first_est.position,
        &first_gt.position,
        &to_tracker.rotate_vector(&heading),
        &heading,
        &AlignmentParams::default(),
    )
    .unwrap();

    let aligned = alignment::apply(&to_ground_truth, &estimated);
    let errors = PoseErrorEvaluator::new(&ground_truth)
        .evaluate(&aligned)
        .unwrap();
    assert_eq!(errors.len(), estimated.len());
    for sample in errors.iter() {
        assert_abs_diff_eq!(sample.position_error, 0.01, epsilon = 1e-6);
        assert!(sample.orientation_error < 1e-4);
    }

    let summary = ErrorSummary::from_samples(&errors).unwrap();
    assert_abs_diff_eq!(summary.position.rmse, 0.01, epsilon = 1e-6);
    assert_eq!(summary.count, errors.len());

    let out = workspace.path().join("errors.csv");
    write_error_table(&out, &errors).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), errors.len() + 1);
}

#[rstest]
fn test_session_runs(workspace: tempfile::TempDir) {
    let gt_path = workspace.path().join("data.csv");
    write_euroc(&gt_path);
    let ground_truth = GroundTruthTrack::new(read_euroc_groundtruth(&gt_path).unwrap()).unwrap();

    let poses_path = workspace.path().join("poses.csv");
    write_tracker_log(&poses_path, &ground_truth, &RigidTransform::identity());
    let estimated = read_pose_table(&poses_path).unwrap();

    let mut params = EvalParams::default();
    params
        .frame_distance
        .diagnostic_dir(None)
        .executor(ExecutorKind::Sequential);
    let session = EvaluationSession::<RgbImage>::new(
        ground_truth,
        FrameStream::default(),
        RigidTransform::identity(),
        params,
    )
    .unwrap();

    let configs = std::iter::once(RunConfig::ground_truth())
        .chain(ApproxConfig::sample().into_iter().map(RunConfig::approximate))
        .collect::<Vec<_>>();
    let results = configs
        .iter()
        .map(|config| session.evaluate_run(*config, Some(&estimated), None).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(results.len(), 6);
    assert_eq!(
        results.iter().map(|r| r.config.label()).collect::<Vec<_>>(),
        vec!["ground truth", "pts=100", "pts=70", "!rk4", "!stereo", "!klt"]
    );
    for run in results.iter() {
        let summary = run.pose_summary().unwrap();
        assert_abs_diff_eq!(summary.position.max, 0.01, epsilon = 1e-6);
        assert!(run.frame_summary().is_none());
    }
}

#[rstest]
fn test_estimate_past_ground_truth_is_fatal(workspace: tempfile::TempDir) {
    let gt_path = workspace.path().join("data.csv");
    write_euroc(&gt_path);
    let ground_truth = GroundTruthTrack::new(read_euroc_groundtruth(&gt_path).unwrap()).unwrap();
    let (_, last) = ground_truth.time_range();

    let mut estimated = PoseStream::default();
    estimated.push(ground_truth.pose_at(last).unwrap()).unwrap();
    let mut late = ground_truth.pose_at(last).unwrap();
    late.timestamp = last + 1;
    estimated.push(late).unwrap();

    assert!(matches!(
        PoseErrorEvaluator::new(&ground_truth).evaluate(&estimated),
        Err(trackeval::EvalError::OutOfRange { .. })
    ));
}
