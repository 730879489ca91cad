use ordered_float::OrderedFloat;

/// Median, mean and maximum of a set of values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub median: f64,
    pub mean: f64,
    pub max: f64,
}

impl Summary {
    /// All statistics are zero when `values` is empty.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.iter().copied().map(OrderedFloat).collect::<Vec<_>>();
        sorted.sort_unstable();

        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1].0 + sorted[mid].0) * 0.5
        } else {
            sorted[mid].0
        };

        Self {
            median,
            mean: values.iter().sum::<f64>() / values.len() as f64,
            max: sorted[sorted.len() - 1].0,
        }
    }
}

/// Root mean square, zero for an empty set.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }
}
