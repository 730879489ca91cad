mod images;
pub(crate) use images::{checker_rgb, gradient_rgb};
mod trajectories;
pub(crate) use trajectories::sample_trajectory;
