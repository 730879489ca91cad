use std::ops::Index;

use log::info;
use serde_derive::{Deserialize, Serialize};

use crate::error::EvalError;

/// Default warm-up period, in nanoseconds, excluded from frame evaluation.
pub const DEFAULT_WARMUP_NS: i64 = 2_000_000_000;

/// A timestamped video frame. `H` is the handle used to get its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord<H> {
    pub timestamp: i64,
    pub image: H,
}

impl<H> FrameRecord<H> {
    pub fn new(timestamp: i64, image: H) -> Self {
        Self { timestamp, image }
    }
}

/// An estimated frame paired with its nearest-in-time ground-truth frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedFrame<H> {
    pub timestamp: i64,
    pub image: H,
    pub matched_gt_timestamp: i64,
    pub matched_gt_image: H,
}

/// Frames with strictly increasing timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameStream<H> {
    frames: Vec<FrameRecord<H>>,
}

impl<H> Default for FrameStream<H> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<H> FrameStream<H> {
    /// Creates a stream, failing if the timestamps are duplicated or out of order.
    pub fn new(frames: Vec<FrameRecord<H>>) -> Result<Self, EvalError> {
        if let Some(pair) = frames
            .windows(2)
            .find(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err(EvalError::ingestion(format!(
                "Frame timestamps must be strictly increasing, found {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameRecord<H>> + '_ {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[FrameRecord<H>] {
        &self.frames
    }

    pub fn first(&self) -> Option<&FrameRecord<H>> {
        self.frames.first()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.frames.iter().map(|frame| frame.timestamp).collect()
    }
}

impl<H> Index<usize> for FrameStream<H> {
    type Output = FrameRecord<H>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}

/// Index of the element of `timestamps` closest to `timestamp`.
///
/// `timestamps` must be sorted. On an exact tie the later element wins, and
/// queries beyond either end clamp to the first or last element.
/// Returns `None` only for an empty slice.
pub fn nearest_index(timestamps: &[i64], timestamp: i64) -> Option<usize> {
    if timestamps.is_empty() {
        return None;
    }

    let insertion = timestamps.partition_point(|t| *t < timestamp);
    if insertion == 0 {
        return Some(0);
    }
    if insertion == timestamps.len() {
        return Some(timestamps.len() - 1);
    }

    let predecessor = insertion - 1;
    let before = timestamp.abs_diff(timestamps[predecessor]);
    let after = timestamps[insertion].abs_diff(timestamp);
    Some(if before < after { predecessor } else { insertion })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Estimated frames earlier than the first estimated frame plus this
    /// duration, in nanoseconds, are discarded.
    pub warmup_ns: i64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            warmup_ns: DEFAULT_WARMUP_NS,
        }
    }
}

impl MatchParams {
    pub fn warmup_ns(&'_ mut self, value: i64) -> &'_ mut MatchParams {
        self.warmup_ns = value;
        self
    }
}

/// Pairs estimated frames with the nearest-in-time ground-truth frame.
#[derive(Debug, Clone, Default)]
pub struct FrameMatcher {
    params: MatchParams,
}

impl FrameMatcher {
    pub fn new(params: MatchParams) -> Self {
        Self { params }
    }

    /// Matches every estimated frame past the warm-up period.
    ///
    /// # Arguments
    ///
    /// * `estimated` - Frames of the run being evaluated.
    /// * `ground_truth` - Reference frames, must not be empty.
    ///
    /// # Returns
    ///
    /// One matched frame per kept estimated frame, in the estimated order.
    pub fn match_frames<H: Clone>(
        &self,
        estimated: &FrameStream<H>,
        ground_truth: &FrameStream<H>,
    ) -> Result<Vec<MatchedFrame<H>>, EvalError> {
        if ground_truth.is_empty() {
            return Err(EvalError::empty_input("Ground truth frame stream is empty"));
        }
        let start = match estimated.first() {
            Some(frame) => frame.timestamp,
            None => return Ok(Vec::new()),
        };
        let cutoff = start.saturating_add(self.params.warmup_ns);

        let gt_timestamps = ground_truth.timestamps();
        let matched = estimated
            .iter()
            .filter(|frame| frame.timestamp >= cutoff)
            .filter_map(|frame| {
                let gt_frame = &ground_truth[nearest_index(&gt_timestamps, frame.timestamp)?];
                Some(MatchedFrame {
                    timestamp: frame.timestamp,
                    image: frame.image.clone(),
                    matched_gt_timestamp: gt_frame.timestamp,
                    matched_gt_image: gt_frame.image.clone(),
                })
            })
            .collect::<Vec<_>>();

        info!(
            "Matched {} frames, {} discarded by the warm-up period",
            matched.len(),
            estimated.len() - matched.len()
        );
        Ok(matched)
    }
}
