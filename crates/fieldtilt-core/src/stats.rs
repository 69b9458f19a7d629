// Column statistics: mean/standard deviation, z-scores and Pearson correlation
// over columns that may contain missing entries.

/// Degrees-of-freedom convention for the standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdDev {
    /// N denominator (ddof = 0).
    Population,
    /// N - 1 denominator (ddof = 1).
    Sample,
}

impl StdDev {
    fn ddof(self) -> usize {
        match self {
            StdDev::Population => 0,
            StdDev::Sample => 1,
        }
    }
}

/// How missing (or NaN) entries affect column statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Statistics are computed over the present entries only.
    Omit,
    /// Any missing entry makes the statistics NaN.
    Propagate,
}

/// Mean and standard deviation of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
    /// Number of entries the statistics were computed over.
    pub count: usize,
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Compute mean and standard deviation of a column.
///
/// With fewer observations than `ddof + 1` the standard deviation is NaN.
pub fn column_stats(values: &[Option<f64>], std_dev: StdDev, policy: MissingPolicy) -> ColumnStats {
    let observed: Vec<f64> = values.iter().filter_map(|v| present(*v)).collect();
    if policy == MissingPolicy::Propagate && observed.len() != values.len() {
        return ColumnStats {
            mean: f64::NAN,
            std: f64::NAN,
            count: values.len(),
        };
    }

    let n = observed.len();
    if n == 0 {
        return ColumnStats {
            mean: f64::NAN,
            std: f64::NAN,
            count: 0,
        };
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    let ddof = std_dev.ddof();
    let std = if n <= ddof {
        f64::NAN
    } else {
        let ss = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        (ss / (n - ddof) as f64).sqrt()
    };
    ColumnStats { mean, std, count: n }
}

/// Z-score a single value against column stats.
///
/// A zero standard deviation yields NaN rather than an error; callers let it
/// flow through downstream sums.
pub fn zscore(value: f64, stats: &ColumnStats) -> f64 {
    if stats.std == 0.0 {
        return f64::NAN;
    }
    (value - stats.mean) / stats.std
}

/// Z-score every entry of a column. Missing entries stay missing.
pub fn zscores(values: &[Option<f64>], std_dev: StdDev, policy: MissingPolicy) -> Vec<Option<f64>> {
    let stats = column_stats(values, std_dev, policy);
    values
        .iter()
        .map(|v| v.map(|x| zscore(x, &stats)))
        .collect()
}

/// Pearson correlation over the rows where both columns are present.
///
/// Returns `None` when fewer than two complete pairs exist or either side has
/// zero variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some((present(*a)?, present(*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn population_stats_known_values() {
        // Mean = 5, population variance = 32 / 8 = 4
        let values = col(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = column_stats(&values, StdDev::Population, MissingPolicy::Omit);
        assert!(approx_eq(stats.mean, 5.0, 1e-12));
        assert!(approx_eq(stats.std, 2.0, 1e-12));
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn sample_stats_known_values() {
        // Sample variance = 32 / 7
        let values = col(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = column_stats(&values, StdDev::Sample, MissingPolicy::Omit);
        assert!(approx_eq(stats.std, (32.0f64 / 7.0).sqrt(), 1e-12));
    }

    #[test]
    fn omit_ignores_missing_entries() {
        let values = vec![Some(1.0), None, Some(3.0), Some(f64::NAN)];
        let stats = column_stats(&values, StdDev::Population, MissingPolicy::Omit);
        assert!(approx_eq(stats.mean, 2.0, 1e-12));
        assert!(approx_eq(stats.std, 1.0, 1e-12));
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn propagate_turns_missing_into_nan() {
        let values = vec![Some(1.0), None, Some(3.0)];
        let stats = column_stats(&values, StdDev::Population, MissingPolicy::Propagate);
        assert!(stats.mean.is_nan());
        assert!(stats.std.is_nan());

        let z = zscores(&values, StdDev::Population, MissingPolicy::Propagate);
        assert!(z[0].unwrap().is_nan());
        assert!(z[1].is_none());
        assert!(z[2].unwrap().is_nan());
    }

    #[test]
    fn single_value_sample_std_is_nan() {
        let stats = column_stats(&col(&[4.0]), StdDev::Sample, MissingPolicy::Omit);
        assert!(approx_eq(stats.mean, 4.0, 1e-12));
        assert!(stats.std.is_nan());
    }

    #[test]
    fn zscores_have_zero_mean_unit_std() {
        let z = zscores(&col(&[1.0, 2.0, 3.0, 10.0]), StdDev::Population, MissingPolicy::Omit);
        let stats = column_stats(&z, StdDev::Population, MissingPolicy::Omit);
        assert!(approx_eq(stats.mean, 0.0, 1e-12));
        assert!(approx_eq(stats.std, 1.0, 1e-12));
    }

    #[test]
    fn zero_variance_yields_nan() {
        let z = zscores(&col(&[5.0, 5.0, 5.0]), StdDev::Population, MissingPolicy::Omit);
        assert!(z.iter().all(|v| v.unwrap().is_nan()));
    }

    #[test]
    fn pearson_perfect_positive_and_negative() {
        let x = col(&[1.0, 2.0, 3.0, 4.0]);
        let y = col(&[2.0, 4.0, 6.0, 8.0]);
        let neg = col(&[8.0, 6.0, 4.0, 2.0]);
        assert!(approx_eq(pearson(&x, &y).unwrap(), 1.0, 1e-12));
        assert!(approx_eq(pearson(&x, &neg).unwrap(), -1.0, 1e-12));
    }

    #[test]
    fn pearson_pairwise_complete() {
        // The pair with a missing y is dropped; remaining pairs are perfectly correlated.
        let x = col(&[1.0, 2.0, 3.0, 100.0]);
        let y = vec![Some(1.0), Some(2.0), Some(3.0), None];
        assert!(approx_eq(pearson(&x, &y).unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn pearson_undefined_cases() {
        assert!(pearson(&col(&[1.0]), &col(&[2.0])).is_none());
        assert!(pearson(&col(&[1.0, 1.0, 1.0]), &col(&[1.0, 2.0, 3.0])).is_none());
    }

    #[test]
    fn pearson_zero_correlation() {
        let x = col(&[1.0, 2.0, 3.0]);
        let y = col(&[1.0, 0.0, 1.0]);
        assert!(approx_eq(pearson(&x, &y).unwrap(), 0.0, 1e-12));
    }
}
