pub mod alignment;
pub mod cache;
pub mod error;
pub mod executor;
pub mod frame_distance;
pub mod frames;
pub mod ground_truth;
pub mod image;
pub mod io;
pub mod metrics;
pub mod params;
pub mod results;
pub mod session;
pub mod stats;
pub mod trajectory;
pub mod transform;

mod diagnostics;

#[cfg(test)]
mod unit_test;

pub use error::EvalError;
pub use ground_truth::GroundTruthTrack;
pub use trajectory::{Pose, PoseStream};
pub use transform::RigidTransform;
