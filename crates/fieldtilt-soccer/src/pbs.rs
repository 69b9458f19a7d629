// Press Breaking Score (PBS).
//
// Each on-ball action gets three raw components: lines broken (opponents
// bypassed, scaled by how much the local opponent density dropped), the
// possession value the action added, and the space gained from nearby
// opponents. Components are z-scored across the whole batch and summed, so a
// score is only meaningful relative to the other actions it was computed with.

use serde::{Deserialize, Serialize};
use tracing::debug;

use fieldtilt_core::error::ScoreResult;
use fieldtilt_core::stats::{column_stats, zscore, ColumnStats, MissingPolicy, StdDev};
use fieldtilt_core::table::{MetricTable, Row, Value};

use crate::error::IndexError;

pub const OPPONENTS_BEFORE: &str = "opponents_before";
pub const OPPONENTS_AFTER: &str = "opponents_after";
pub const AVG_DISTANCE_BEFORE: &str = "avg_distance_before";
pub const AVG_DISTANCE_AFTER: &str = "avg_distance_after";
pub const NUMBER_BYPASSED: &str = "number_bypassed";
pub const POSSESSION_VALUE_CHANGE: &str = "possession_value_change";

/// Input columns every action row must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    OPPONENTS_BEFORE,
    OPPONENTS_AFTER,
    AVG_DISTANCE_BEFORE,
    AVG_DISTANCE_AFTER,
    NUMBER_BYPASSED,
    POSSESSION_VALUE_CHANGE,
];

/// Output columns, appended in this order.
pub const PBS_COLUMN: &str = "PBS";
pub const Z_LINE_BREAK_COLUMN: &str = "z_line_break_value_daf";
pub const Z_POSSESSION_VALUE_COLUMN: &str = "z_possession_value_change";
pub const Z_OPV_COLUMN: &str = "z_opv";

/// Tunable constants of the component formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PbsParams {
    /// Radius around the ball within which opponents are counted.
    pub radius: f64,
    /// Density factor used when no opponents remain inside the radius.
    pub max_density_adjustment_factor: f64,
}

impl Default for PbsParams {
    fn default() -> Self {
        PbsParams {
            radius: 10.0,
            max_density_adjustment_factor: 5.0,
        }
    }
}

/// One on-ball action. Missing cells are carried as NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressAction {
    pub opponents_before: f64,
    pub opponents_after: f64,
    pub avg_distance_before: f64,
    pub avg_distance_after: f64,
    pub number_bypassed: f64,
    pub possession_value_change: f64,
}

impl PressAction {
    pub fn from_row(row: &Row<'_>) -> ScoreResult<Self> {
        Ok(PressAction {
            opponents_before: row.number_or_nan(OPPONENTS_BEFORE)?,
            opponents_after: row.number_or_nan(OPPONENTS_AFTER)?,
            avg_distance_before: row.number_or_nan(AVG_DISTANCE_BEFORE)?,
            avg_distance_after: row.number_or_nan(AVG_DISTANCE_AFTER)?,
            number_bypassed: row.number_or_nan(NUMBER_BYPASSED)?,
            possession_value_change: row.number_or_nan(POSSESSION_VALUE_CHANGE)?,
        })
    }

    /// How much the opponent density around the ball dropped.
    pub fn density_adjustment_factor(&self, params: &PbsParams) -> f64 {
        if self.opponents_after == 0.0 {
            params.max_density_adjustment_factor
        } else {
            self.opponents_before / self.opponents_after
        }
    }

    /// Distance gained from nearby opponents. With nobody left in range the
    /// whole radius counts as gained space.
    pub fn opponent_proximity_value(&self, params: &PbsParams) -> f64 {
        if self.opponents_after == 0.0 {
            params.radius - self.avg_distance_before
        } else {
            self.avg_distance_after - self.avg_distance_before
        }
    }

    pub fn components(&self, params: &PbsParams) -> PbsComponents {
        PbsComponents {
            line_break_value_daf: self.number_bypassed * self.density_adjustment_factor(params),
            possession_value_change: self.possession_value_change,
            opv: self.opponent_proximity_value(params),
        }
    }
}

/// Raw (un-normalized) components of one action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbsComponents {
    pub line_break_value_daf: f64,
    pub possession_value_change: f64,
    pub opv: f64,
}

/// Per-component statistics used to normalize a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PbsNormalization {
    pub line_break_value_daf: ComponentSummary,
    pub possession_value_change: ComponentSummary,
    pub opv: ComponentSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub mean: f64,
    pub std: f64,
}

impl From<ColumnStats> for ComponentSummary {
    fn from(stats: ColumnStats) -> Self {
        ComponentSummary {
            mean: stats.mean,
            std: stats.std,
        }
    }
}

/// Scored batch: the input table with PBS columns appended.
#[derive(Debug, Clone, PartialEq)]
pub struct PbsOutput {
    pub table: MetricTable,
    pub normalization: PbsNormalization,
}

/// Score every action in the table.
///
/// Components are z-scored with the sample standard deviation, ignoring
/// missing entries when computing mean and spread. A constant component
/// yields NaN for every row.
pub fn press_breaking_scores(table: &MetricTable, params: &PbsParams) -> Result<PbsOutput, IndexError> {
    table.require_columns(REQUIRED_COLUMNS)?;

    let mut line_break = Vec::with_capacity(table.len());
    let mut value_change = Vec::with_capacity(table.len());
    let mut opv = Vec::with_capacity(table.len());
    for row in table.rows() {
        let components = PressAction::from_row(&row)?.components(params);
        line_break.push(Some(components.line_break_value_daf));
        value_change.push(Some(components.possession_value_change));
        opv.push(Some(components.opv));
    }

    let line_break_stats = column_stats(&line_break, StdDev::Sample, MissingPolicy::Omit);
    let value_change_stats = column_stats(&value_change, StdDev::Sample, MissingPolicy::Omit);
    let opv_stats = column_stats(&opv, StdDev::Sample, MissingPolicy::Omit);
    debug!(
        rows = table.len(),
        line_break_std = line_break_stats.std,
        value_change_std = value_change_stats.std,
        opv_std = opv_stats.std,
        "PBS component statistics"
    );

    let z = |values: &[Option<f64>], stats: &ColumnStats| -> Vec<f64> {
        values
            .iter()
            .map(|v| v.map_or(f64::NAN, |x| zscore(x, stats)))
            .collect()
    };
    let z_line_break = z(&line_break, &line_break_stats);
    let z_value_change = z(&value_change, &value_change_stats);
    let z_opv = z(&opv, &opv_stats);

    let pbs: Vec<Value> = z_line_break
        .iter()
        .zip(&z_value_change)
        .zip(&z_opv)
        .map(|((a, b), c)| Value::Number(a + b + c))
        .collect();

    let mut out = table.clone();
    out.set_column(PBS_COLUMN, pbs)?;
    out.set_column(Z_LINE_BREAK_COLUMN, z_line_break.into_iter().map(Value::Number).collect())?;
    out.set_column(
        Z_POSSESSION_VALUE_COLUMN,
        z_value_change.into_iter().map(Value::Number).collect(),
    )?;
    out.set_column(Z_OPV_COLUMN, z_opv.into_iter().map(Value::Number).collect())?;

    Ok(PbsOutput {
        table: out,
        normalization: PbsNormalization {
            line_break_value_daf: line_break_stats.into(),
            possession_value_change: value_change_stats.into(),
            opv: opv_stats.into(),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
