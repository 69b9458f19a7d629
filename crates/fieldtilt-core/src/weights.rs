// Metric weight tables and correlation-derived weighting.
//
// Weights are learned from each metric's correlation to an outcome column
// (goals scored, goals prevented), then optionally rescaled by the spread of
// the metric's z-scores so that every metric contributes in proportion.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::error::{ScoreError, ScoreResult};
use crate::stats::{column_stats, pearson, zscores, MissingPolicy, StdDev};
use crate::table::MetricTable;

// ---------------------------------------------------------------------------
// WeightTable
// ---------------------------------------------------------------------------

/// Ordered mapping of metric name to weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    entries: Vec<(String, f64)>,
}

impl WeightTable {
    /// Build from (metric, weight) pairs. A repeated metric keeps the last weight.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, f64)> = Vec::new();
        for (metric, weight) in pairs {
            let metric = metric.into();
            match entries.iter_mut().find(|(m, _)| *m == metric) {
                Some(entry) => entry.1 = weight,
                None => entries.push((metric, weight)),
            }
        }
        WeightTable { entries }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(m, _)| m == metric)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(m, w)| (m.as_str(), *w))
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for WeightTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (metric, weight) in &self.entries {
            map.serialize_entry(metric, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeightTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WeightTableVisitor;

        impl<'de> Visitor<'de> for WeightTableVisitor {
            type Value = WeightTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of metric names to numeric weights")
            }

            // Document order is kept; it is the order metrics are summed in.
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<WeightTable, A::Error> {
                let mut pairs: Vec<(String, f64)> = Vec::new();
                while let Some((metric, weight)) = access.next_entry::<String, f64>()? {
                    pairs.push((metric, weight));
                }
                Ok(WeightTable::from_pairs(pairs))
            }
        }

        deserializer.deserialize_map(WeightTableVisitor)
    }
}

// ---------------------------------------------------------------------------
// Correlation weighting
// ---------------------------------------------------------------------------

/// Derive metric weights from their correlation to `target`.
///
/// Steps:
/// 1. Pearson correlation of every metric against the target (pairwise
///    complete rows). An undefined correlation counts as 0.
/// 2. Initial weight = |r| / sum(|r|).
/// 3. With `normalize`, each initial weight is multiplied by the population
///    standard deviation of the metric's z-scores and the result is
///    renormalized. The z-scores propagate missing entries, so a metric with
///    any missing cell ends up with a NaN weight; that is kept as-is.
pub fn compute_weights(
    table: &MetricTable,
    metrics: &[&str],
    target: &str,
    normalize: bool,
) -> ScoreResult<WeightTable> {
    table.require_columns(metrics.iter().copied().chain(std::iter::once(target)))?;
    let target_values = table.numeric_column(target)?;

    let mut columns = Vec::with_capacity(metrics.len());
    let mut correlations = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        let values = table.numeric_column(metric)?;
        let r = match pearson(&values, &target_values) {
            Some(r) => r,
            None => {
                warn!(
                    "correlation of `{}` with `{}` is undefined; treating it as 0",
                    metric, target
                );
                0.0
            }
        };
        debug!(metric, target, correlation = r, "metric correlation");
        correlations.push(r);
        columns.push(values);
    }

    let total_correlation: f64 = correlations.iter().map(|r| r.abs()).sum();
    if total_correlation == 0.0 {
        return Err(ScoreError::DegenerateInput {
            reason: format!("no metric is correlated with `{target}`"),
        });
    }
    let initial: Vec<f64> = correlations
        .iter()
        .map(|r| r.abs() / total_correlation)
        .collect();

    if !normalize {
        return Ok(WeightTable::from_pairs(
            metrics.iter().copied().zip(initial),
        ));
    }

    let adjusted: Vec<f64> = initial
        .iter()
        .zip(&columns)
        .map(|(weight, values)| {
            let z = zscores(values, StdDev::Population, MissingPolicy::Propagate);
            let spread = column_stats(&z, StdDev::Population, MissingPolicy::Propagate).std;
            weight * spread
        })
        .collect();

    let total_adjusted: f64 = adjusted.iter().sum();
    if total_adjusted == 0.0 {
        return Err(ScoreError::DegenerateInput {
            reason: format!("adjusted weights for `{target}` sum to zero"),
        });
    }
    if !total_adjusted.is_finite() {
        warn!(
            "adjusted weights for `{}` are not finite (missing values in a metric column)",
            target
        );
    }

    Ok(WeightTable::from_pairs(
        metrics
            .iter()
            .copied()
            .zip(adjusted.into_iter().map(|w| w / total_adjusted)),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
