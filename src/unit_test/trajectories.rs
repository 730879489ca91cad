use nalgebra::{UnitQuaternion, Vector3};
use rstest::fixture;

use crate::trajectory::{Pose, PoseStream};

/// 50 poses at 20 Hz along a rising helix, starting at 1 s.
#[fixture]
pub fn sample_trajectory() -> PoseStream {
    let poses = (0..50)
        .map(|i| {
            let t = i as f64 * 0.1;
            Pose::from_parts(
                1_000_000_000 + i * 50_000_000,
                Vector3::new(t.cos(), t.sin(), 0.1 * t),
                UnitQuaternion::from_euler_angles(0.1 * t.sin(), 0.05 * t, t),
            )
        })
        .collect();
    PoseStream::new(poses).unwrap()
}
