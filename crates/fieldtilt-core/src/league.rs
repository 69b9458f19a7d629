// Cross-league adjustment factors.
//
// Each league's metric means are rebased onto a baseline league (usually a
// cross-league "Mean" row): factor = baseline_mean / league_mean. Player
// metrics are multiplied by their league's factor before scoring.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ScoreError, ScoreResult};
use crate::table::{MetricTable, Row, Value};

/// Columns of a league summary that are identity/metadata, never metrics.
pub const DEFAULT_EXCLUDED_COLUMNS: &[&str] =
    &["Player", "League", "Pos", "Squad", "Nation", "Age", "Born", "Mins"];

#[derive(Debug, Clone)]
pub struct AdjustmentOptions {
    pub league_column: String,
    pub excluded_columns: Vec<String>,
}

impl Default for AdjustmentOptions {
    fn default() -> Self {
        AdjustmentOptions {
            league_column: "League".into(),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// AdjustmentFactorTable
// ---------------------------------------------------------------------------

/// Per-(league, metric) scaling factors relative to a baseline league.
///
/// The baseline league has no entries; it and any unknown pair look up as 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentFactorTable {
    baseline: String,
    factors: BTreeMap<String, BTreeMap<String, f64>>,
}

impl AdjustmentFactorTable {
    pub fn new(baseline: &str) -> Self {
        AdjustmentFactorTable {
            baseline: baseline.to_string(),
            factors: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, league: &str, metric: &str, factor: f64) {
        self.factors
            .entry(league.to_string())
            .or_default()
            .insert(metric.to_string(), factor);
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Factor for a (league, metric) pair; 1 when none is stored.
    pub fn factor(&self, league: &str, metric: &str) -> f64 {
        self.factors
            .get(league)
            .and_then(|m| m.get(metric))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn leagues(&self) -> impl Iterator<Item = &str> + '_ {
        self.factors.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Factor computation
// ---------------------------------------------------------------------------

/// Compute adjustment factors from a league summary table (one row of metric
/// means per league).
///
/// For every non-baseline league L and metric M the factor is
/// `baseline[M] / L[M]`, or 1 when `L[M]` is zero. A missing mean on either
/// side gives a NaN factor, so adjusted values for that pair become NaN.
/// Columns holding any text are not metrics and get no factors.
pub fn compute_adjustment_factors(
    summary: &MetricTable,
    baseline_league: &str,
    options: &AdjustmentOptions,
) -> ScoreResult<AdjustmentFactorTable> {
    let league_col = options.league_column.as_str();
    summary.require_columns([league_col])?;

    let mut metrics: Vec<&str> = Vec::new();
    for column in summary.columns() {
        let column = column.as_str();
        if column == league_col || options.excluded_columns.iter().any(|e| e == column) {
            continue;
        }
        let text_rows: Vec<usize> = summary
            .rows()
            .filter(|row| matches!(row.get(column), Some(Value::Text(_))))
            .map(|row| row.index())
            .collect();
        if !text_rows.is_empty() {
            warn!(
                "league summary column `{}` has text in rows {:?}; metric left unadjusted for every league",
                column, text_rows
            );
            continue;
        }
        metrics.push(column);
    }
    debug!("{} league summary metrics", metrics.len());

    // First row per league wins.
    let mut league_rows: Vec<(String, Row<'_>)> = Vec::new();
    for row in summary.rows() {
        let Some(league) = row.label(league_col) else {
            warn!("league summary row {} has no league; skipped", row.index());
            continue;
        };
        if league_rows.iter().any(|(l, _)| *l == league) {
            warn!("duplicate league summary row for `{}`; keeping the first", league);
            continue;
        }
        league_rows.push((league, row));
    }

    let baseline_row = league_rows
        .iter()
        .find(|(l, _)| l == baseline_league)
        .map(|(_, row)| *row)
        .ok_or_else(|| ScoreError::LeagueNotFound {
            league: baseline_league.to_string(),
        })?;

    let mut table = AdjustmentFactorTable::new(baseline_league);
    for (league, row) in &league_rows {
        if league == baseline_league {
            continue;
        }
        for &metric in &metrics {
            let factor = match (baseline_row.number(metric)?, row.number(metric)?) {
                (_, Some(mean)) if mean == 0.0 => 1.0,
                (Some(base), Some(mean)) => base / mean,
                (base, _) => {
                    let side = if base.is_none() { baseline_league } else { league.as_str() };
                    warn!(
                        "league `{}` metric `{}`: no mean for `{}`; factor is NaN",
                        league, metric, side
                    );
                    f64::NAN
                }
            };
            table.insert(league, metric, factor);
        }
    }
    Ok(table)
}

/// Multiply each listed metric of a player row by its league factor.
///
/// Rows from the baseline league, unknown leagues, or without a league, and
/// metrics lacking a factor pass through unchanged. Missing cells stay missing.
pub fn apply_adjustment(
    row: &Row<'_>,
    metrics: &[&str],
    factors: &AdjustmentFactorTable,
    league_column: &str,
) -> ScoreResult<HashMap<String, Option<f64>>> {
    let league = row.label(league_column);
    let mut adjusted = HashMap::with_capacity(metrics.len());
    for &metric in metrics {
        let value = row.number(metric)?;
        let factor = match &league {
            Some(l) if l != factors.baseline() => factors.factor(l, metric),
            _ => 1.0,
        };
        adjusted.insert(metric.to_string(), value.map(|v| v * factor));
    }
    Ok(adjusted)
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

    fn summary() -> MetricTable {
        MetricTable::from_rows(
            ["League", "Mins", "xA", "Sh", "Crs"],
            vec![
                vec!["Mean".into(), 1500.0.into(), 0.2.into(), 2.0.into(), 3.0.into()],
                vec!["Liga F".into(), 1400.0.into(), 0.1.into(), 4.0.into(), 0.0.into()],
                vec!["WSL".into(), 1600.0.into(), 0.25.into(), Value::Missing, 6.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn factors_rebase_to_baseline() {
        let factors =
            compute_adjustment_factors(&summary(), "Mean", &AdjustmentOptions::default()).unwrap();
        assert!(approx_eq(factors.factor("Liga F", "xA"), 2.0, 1e-12));
        assert!(approx_eq(factors.factor("Liga F", "Sh"), 0.5, 1e-12));
        assert!(approx_eq(factors.factor("WSL", "xA"), 0.8, 1e-12));
        assert!(approx_eq(factors.factor("WSL", "Crs"), 0.5, 1e-12));
    }

    #[test]
    fn zero_league_mean_gives_identity() {
        let factors =
            compute_adjustment_factors(&summary(), "Mean", &AdjustmentOptions::default()).unwrap();
        assert_eq!(factors.factor("Liga F", "Crs"), 1.0);
    }

    #[test]
    fn baseline_and_unknown_pairs_are_identity() {
        let factors =
            compute_adjustment_factors(&summary(), "Mean", &AdjustmentOptions::default()).unwrap();
        let leagues: Vec<&str> = factors.leagues().collect();
        assert_eq!(leagues, vec!["Liga F", "WSL"]);
        assert_eq!(factors.factor("Mean", "xA"), 1.0);
        assert_eq!(factors.factor("Serie A", "xA"), 1.0);
        // Excluded metadata column.
        assert_eq!(factors.factor("Liga F", "Mins"), 1.0);
    }

    #[test]
    fn missing_baseline_is_league_not_found() {
        let err = compute_adjustment_factors(&summary(), "UWCL", &AdjustmentOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            ScoreError::LeagueNotFound {
                league: "UWCL".into()
            }
        );
    }

    #[test]
    fn missing_league_column_fails() {
        let options = AdjustmentOptions {
            league_column: "Competition".into(),
            ..AdjustmentOptions::default()
        };
        let err = compute_adjustment_factors(&summary(), "Mean", &options).unwrap_err();
        assert_eq!(err, ScoreError::missing_columns(["Competition"]));
    }

    #[test]
    fn duplicate_league_rows_keep_first() {
        let mut table = summary();
        table
            .push_row(vec!["Liga F".into(), 0.0.into(), 0.4.into(), 1.0.into(), 1.0.into()])
            .unwrap();
        let factors =
            compute_adjustment_factors(&table, "Mean", &AdjustmentOptions::default()).unwrap();
        assert!(approx_eq(factors.factor("Liga F", "xA"), 2.0, 1e-12));
    }

    #[test]
    fn apply_adjustment_scales_by_league() {
        let factors =
            compute_adjustment_factors(&summary(), "Mean", &AdjustmentOptions::default()).unwrap();
        let players = MetricTable::from_rows(
            ["Player", "League", "xA", "Sh"],
            vec![
                vec!["A".into(), "Liga F".into(), 0.3.into(), 2.0.into()],
                vec!["B".into(), "Mean".into(), 0.3.into(), 2.0.into()],
                vec!["C".into(), "Serie A".into(), 0.3.into(), Value::Missing],
            ],
        )
        .unwrap();

        let a = apply_adjustment(&players.row(0).unwrap(), &["xA", "Sh"], &factors, "League")
            .unwrap();
        assert!(approx_eq(a["xA"].unwrap(), 0.6, 1e-12));
        assert!(approx_eq(a["Sh"].unwrap(), 1.0, 1e-12));

        let b = apply_adjustment(&players.row(1).unwrap(), &["xA"], &factors, "League").unwrap();
        assert!(approx_eq(b["xA"].unwrap(), 0.3, 1e-12));

        let c = apply_adjustment(&players.row(2).unwrap(), &["xA", "Sh"], &factors, "League")
            .unwrap();
        assert!(approx_eq(c["xA"].unwrap(), 0.3, 1e-12));
        assert_eq!(c["Sh"], None);
    }

    #[test]
    fn missing_league_mean_gives_nan_factor() {
        let factors =
            compute_adjustment_factors(&summary(), "Mean", &AdjustmentOptions::default()).unwrap();
        assert!(factors.factor("WSL", "Sh").is_nan());

        let table = MetricTable::from_rows(
            ["League", "xA"],
            vec![
                vec!["Mean".into(), Value::Missing],
                vec!["WSL".into(), 0.2.into()],
            ],
        )
        .unwrap();
        let factors =
            compute_adjustment_factors(&table, "Mean", &AdjustmentOptions::default()).unwrap();
        assert!(factors.factor("WSL", "xA").is_nan());
    }

    #[test]
    fn nan_factor_propagates_into_adjusted_value() {
        let table = MetricTable::from_rows(
            ["League", "xA"],
            vec![
                vec!["Mean".into(), 0.2.into()],
                vec!["WSL".into(), Value::Missing],
            ],
        )
        .unwrap();
        let factors =
            compute_adjustment_factors(&table, "Mean", &AdjustmentOptions::default()).unwrap();
        let players = MetricTable::from_rows(
            ["Player", "League", "xA"],
            vec![vec!["A".into(), "WSL".into(), 0.3.into()]],
        )
        .unwrap();
        let adjusted =
            apply_adjustment(&players.row(0).unwrap(), &["xA"], &factors, "League").unwrap();
        assert!(adjusted["xA"].unwrap().is_nan());
    }

    #[test]
    fn text_column_is_not_a_metric() {
        let table = MetricTable::from_rows(
            ["League", "Region", "xA"],
            vec![
                vec!["Mean".into(), "Europe".into(), 0.2.into()],
                vec!["WSL".into(), 3.0.into(), 0.1.into()],
            ],
        )
        .unwrap();
        let factors =
            compute_adjustment_factors(&table, "Mean", &AdjustmentOptions::default()).unwrap();
        assert_eq!(factors.factor("WSL", "Region"), 1.0);
        assert!(approx_eq(factors.factor("WSL", "xA"), 2.0, 1e-12));
    }
}
