use std::path::PathBuf;

use image::RgbImage;
use log::{debug, info, warn};
use serde_derive::{Deserialize, Serialize};

use crate::{
    diagnostics::DiagnosticSampler,
    error::EvalError,
    executor::{into_job_order, Executor, ExecutorKind, Sequential, ThreadPool},
    frames::MatchedFrame,
    image::{
        BruteForceMatcher, DescriptorMatcher, FeatureExtractor, HarrisPatchExtractor,
        ImageHandle, ImageSimilarity, IntoArray3, IntoLumaArray, Ssim,
    },
    stats::Summary,
};

/// Image distances of one matched frame pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDistanceSample {
    pub timestamp: i64,
    pub matched_gt_timestamp: i64,
    pub ssim: f64,
    pub median_feature_distance: f64,
    pub mean_feature_distance: f64,
    pub max_feature_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameDistanceParams {
    /// Chance of writing a diagnostic picture for a pair.
    pub diagnostic_probability: f64,
    /// Where diagnostics go. `None` disables them.
    pub diagnostic_dir: Option<PathBuf>,
    pub executor: ExecutorKind,
    /// Keypoints kept per image.
    pub max_features: usize,
}

impl Default for FrameDistanceParams {
    fn default() -> Self {
        Self {
            diagnostic_probability: 1.0 / 200.0,
            diagnostic_dir: Some(std::env::temp_dir().join("trackeval-diagnostics")),
            executor: ExecutorKind::default(),
            max_features: HarrisPatchExtractor::default().max_features,
        }
    }
}

impl FrameDistanceParams {
    pub fn diagnostic_probability(&'_ mut self, value: f64) -> &'_ mut FrameDistanceParams {
        self.diagnostic_probability = value;
        self
    }

    pub fn diagnostic_dir(&'_ mut self, value: Option<PathBuf>) -> &'_ mut FrameDistanceParams {
        self.diagnostic_dir = value;
        self
    }

    pub fn executor(&'_ mut self, value: ExecutorKind) -> &'_ mut FrameDistanceParams {
        self.executor = value;
        self
    }
}

/// Median, mean and max distance of the best descriptor matches between two images.
/// All three are zero when nothing matches.
pub fn feature_distance<F, M>(
    extractor: &F,
    matcher: &M,
    lhs: &RgbImage,
    rhs: &RgbImage,
) -> Result<Summary, EvalError>
where
    F: FeatureExtractor,
    M: DescriptorMatcher,
{
    let lhs_features = extractor.detect_and_compute(&lhs.into_array3().view().to_luma_array().view())?;
    let rhs_features = extractor.detect_and_compute(&rhs.into_array3().view().to_luma_array().view())?;

    let distances = matcher
        .match_descriptors(
            &lhs_features.descriptors.view(),
            &rhs_features.descriptors.view(),
        )?
        .iter()
        .map(|m| m.distance as f64)
        .collect::<Vec<_>>();
    debug!(
        "{} and {} keypoints, {} matches",
        lhs_features.len(),
        rhs_features.len(),
        distances.len()
    );
    Ok(Summary::from_values(&distances))
}

/// Computes SSIM and feature distances of matched frame pairs.
///
/// Each pair is independent. The returned samples always follow the order of
/// the input pairs, whatever order the executor completes them in.
pub struct FrameDistanceEvaluator<S = Ssim, F = HarrisPatchExtractor, M = BruteForceMatcher> {
    similarity: S,
    extractor: F,
    matcher: M,
    params: FrameDistanceParams,
    diagnostics: Option<DiagnosticSampler>,
    pool: Option<ThreadPool>,
}

impl FrameDistanceEvaluator {
    /// Evaluator with the default image primitives.
    pub fn new(params: FrameDistanceParams) -> Result<Self, EvalError> {
        let mut extractor = HarrisPatchExtractor::default();
        extractor.max_features(params.max_features);
        Self::with_components(Ssim::default(), extractor, BruteForceMatcher::default(), params)
    }
}

impl<S, F, M> FrameDistanceEvaluator<S, F, M>
where
    S: ImageSimilarity,
    F: FeatureExtractor,
    M: DescriptorMatcher,
{
    /// Builds the evaluator around custom image primitives.
    ///
    /// The worker pool of `params.executor` is created here and shared by
    /// every later call to [`FrameDistanceEvaluator::evaluate`].
    pub fn with_components(
        similarity: S,
        extractor: F,
        matcher: M,
        params: FrameDistanceParams,
    ) -> Result<Self, EvalError> {
        let diagnostics = params
            .diagnostic_dir
            .as_ref()
            .map(|dir| DiagnosticSampler::new(params.diagnostic_probability, dir));
        let pool = match params.executor {
            ExecutorKind::Sequential => None,
            ExecutorKind::ThreadPool { num_threads } => Some(ThreadPool::new(num_threads)?),
        };
        Ok(Self {
            similarity,
            extractor,
            matcher,
            params,
            diagnostics,
            pool,
        })
    }

    pub fn params(&self) -> &FrameDistanceParams {
        &self.params
    }

    /// Workers used by [`FrameDistanceEvaluator::evaluate`], 1 when sequential.
    pub fn num_threads(&self) -> usize {
        self.pool.as_ref().map_or(1, ThreadPool::num_threads)
    }

    /// Evaluates a single pair.
    pub fn evaluate_pair<H: ImageHandle>(
        &self,
        pair: &MatchedFrame<H>,
    ) -> Result<FrameDistanceSample, EvalError> {
        let estimated = pair.image.load()?;
        let ground_truth = pair.matched_gt_image.load()?;

        let ssim = self.similarity.similarity(&estimated, &ground_truth)?;
        let features = feature_distance(&self.extractor, &self.matcher, &estimated, &ground_truth)?;

        if let Some(sampler) = &self.diagnostics {
            if sampler.should_sample() {
                let written = self
                    .similarity
                    .similarity_map(&estimated, &ground_truth)
                    .and_then(|map| {
                        sampler.record(
                            &pair.image.describe(),
                            &pair.matched_gt_image.describe(),
                            &map,
                            ssim,
                        )
                    });
                match written {
                    Ok(path) => debug!("Wrote diagnostic {}", path.display()),
                    Err(err) => warn!("Could not write the frame diagnostic: {err}"),
                }
            }
        }

        Ok(FrameDistanceSample {
            timestamp: pair.timestamp,
            matched_gt_timestamp: pair.matched_gt_timestamp,
            ssim,
            median_feature_distance: features.median,
            mean_feature_distance: features.mean,
            max_feature_distance: features.max,
        })
    }

    /// Evaluates all pairs with the given executor.
    ///
    /// Any failing pair fails the whole call.
    pub fn evaluate_with<H, E>(
        &self,
        pairs: &[MatchedFrame<H>],
        executor: &E,
    ) -> Result<Vec<FrameDistanceSample>, EvalError>
    where
        H: ImageHandle,
        E: Executor,
    {
        let tagged = executor.run(pairs.len(), |index| self.evaluate_pair(&pairs[index]));
        let samples = into_job_order(tagged, pairs.len())?
            .into_iter()
            .collect::<Result<Vec<_>, EvalError>>()?;

        info!("Computed the image distances of {} frame pairs", samples.len());
        Ok(samples)
    }

    /// Evaluates all pairs with the executor selected in the parameters.
    pub fn evaluate<H: ImageHandle>(
        &self,
        pairs: &[MatchedFrame<H>],
    ) -> Result<Vec<FrameDistanceSample>, EvalError> {
        match &self.pool {
            Some(pool) => self.evaluate_with(pairs, pool),
            None => self.evaluate_with(pairs, &Sequential),
        }
    }
}
