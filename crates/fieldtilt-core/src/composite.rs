// Weighted-sum composite scoring.

use crate::error::ScoreResult;
use crate::table::Row;
use crate::weights::WeightTable;

/// Sum of value * weight over all pairs. Empty input yields 0 and NaN
/// propagates. Weight totals are not checked here.
pub fn weighted_sum<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    pairs.into_iter().map(|(value, weight)| value * weight).sum()
}

/// Named (value, weight) pairs feeding one composite index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedMetrics {
    entries: Vec<(String, f64, f64)>,
}

impl WeightedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a metric.
    pub fn insert(&mut self, metric: &str, value: f64, weight: f64) {
        match self.entries.iter_mut().find(|(m, _, _)| m == metric) {
            Some(entry) => {
                entry.1 = value;
                entry.2 = weight;
            }
            None => self.entries.push((metric.to_string(), value, weight)),
        }
    }

    /// Pair each weighted metric with its value in `row`. Missing cells read as NaN.
    pub fn from_row(row: &Row<'_>, weights: &WeightTable) -> ScoreResult<Self> {
        let mut out = Self::new();
        for (metric, weight) in weights.iter() {
            out.insert(metric, row.number_or_nan(metric)?, weight);
        }
        Ok(out)
    }

    pub fn get(&self, metric: &str) -> Option<(f64, f64)> {
        self.entries
            .iter()
            .find(|(m, _, _)| m == metric)
            .map(|(_, v, w)| (*v, *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().map(|(_, v, w)| (*v, *w))
    }

    pub fn weighted_sum(&self) -> f64 {
        weighted_sum(self.pairs())
    }
}

impl<S: Into<String>> FromIterator<(S, f64, f64)> for WeightedMetrics {
    fn from_iter<T: IntoIterator<Item = (S, f64, f64)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (metric, value, weight) in iter {
            out.insert(&metric.into(), value, weight);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
