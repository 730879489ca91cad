use ndarray::{ArrayView1, ArrayView2};

use crate::error::EvalError;

/// Association between a descriptor of the query set and one of the train set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorMatch {
    pub query_index: usize,
    pub train_index: usize,
    pub distance: f32,
}

/// Computes a best-match assignment between two descriptor sets.
pub trait DescriptorMatcher: Sync {
    /// # Arguments
    ///
    /// * `query` - Descriptors, one per row.
    /// * `train` - Descriptors, one per row, same number of columns as `query`.
    fn match_descriptors(
        &self,
        query: &ArrayView2<f32>,
        train: &ArrayView2<f32>,
    ) -> Result<Vec<DescriptorMatch>, EvalError>;
}

/// Exhaustive L2 nearest neighbor matching.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BruteForceMatcher {
    /// Keep only the pairs that are each other's nearest neighbor.
    pub cross_check: bool,
}

fn l2_distance(lhs: &ArrayView1<f32>, rhs: &ArrayView1<f32>) -> f32 {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

/// Index and distance of the row of `candidates` nearest to `descriptor`.
/// The first one wins among equals.
fn nearest(descriptor: &ArrayView1<f32>, candidates: &ArrayView2<f32>) -> Option<(usize, f32)> {
    candidates
        .rows()
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| (index, l2_distance(descriptor, &candidate)))
        .fold(None, |best, (index, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((index, distance)),
        })
}

impl DescriptorMatcher for BruteForceMatcher {
    fn match_descriptors(
        &self,
        query: &ArrayView2<f32>,
        train: &ArrayView2<f32>,
    ) -> Result<Vec<DescriptorMatch>, EvalError> {
        if query.ncols() != train.ncols() {
            return Err(EvalError::invalid_parameter(format!(
                "Descriptors of size {} and {} cannot be matched",
                query.ncols(),
                train.ncols()
            )));
        }

        Ok(query
            .rows()
            .into_iter()
            .enumerate()
            .filter_map(|(query_index, descriptor)| {
                let (train_index, distance) = nearest(&descriptor, train)?;
                if self.cross_check {
                    let (back_index, _) = nearest(&train.row(train_index), query)?;
                    if back_index != query_index {
                        return None;
                    }
                }
                Some(DescriptorMatch {
                    query_index,
                    train_index,
                    distance,
                })
            })
            .collect())
    }
}
