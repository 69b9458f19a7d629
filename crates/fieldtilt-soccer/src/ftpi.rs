// Final Third Productivity Index (FTPI).
//
// FTPI = offensive output / (compactness factor * field tilt)
//
// Offensive output is a weighted sum of attacking metrics whose weights follow
// their correlation with goals scored. The compactness factor is a weighted sum
// of the opponent's defensive metrics (weights from correlation with goals
// prevented) divided by the opponent's field tilt.

use serde::Serialize;
use tracing::{info, warn};

use fieldtilt_core::composite::WeightedMetrics;
use fieldtilt_core::error::{ScoreError, ScoreResult};
use fieldtilt_core::table::{MetricTable, Row, Value};
use fieldtilt_core::weights::{compute_weights, WeightTable};

use crate::config::FtpiConfig;
use crate::error::IndexError;

/// Output columns, appended in this order.
pub const COMPACTNESS_FACTOR_COLUMN: &str = "Compactness factor";
pub const OFFENSIVE_OUTPUT_COLUMN: &str = "Offensive output";
pub const FTPI_COLUMN: &str = "FTPI";

// ---------------------------------------------------------------------------
// Scalar formulas
// ---------------------------------------------------------------------------

/// FTPI from its three inputs. Zero compactness or zero field tilt is an
/// `InvalidDivisor` error.
pub fn ftpi(offensive_output: f64, compactness_factor: f64, field_tilt: f64) -> ScoreResult<f64> {
    if compactness_factor == 0.0 {
        return Err(ScoreError::InvalidDivisor {
            name: "compactness_factor",
        });
    }
    if field_tilt == 0.0 {
        return Err(ScoreError::InvalidDivisor { name: "field_tilt" });
    }
    Ok(offensive_output / (compactness_factor * field_tilt))
}

/// Weighted sum of the attacking metrics.
pub fn offensive_output(metrics: &WeightedMetrics) -> f64 {
    metrics.weighted_sum()
}

/// Weighted sum of the defensive metrics divided by the opponent's field tilt.
///
/// The divisor is not guarded: a zero opponent field tilt produces an infinite
/// or NaN factor, which `ftpi` then carries through.
pub fn compactness_factor(metrics: &WeightedMetrics, opponent_field_tilt: f64) -> f64 {
    if opponent_field_tilt == 0.0 {
        warn!("opponent field tilt is zero; compactness factor is not finite");
    }
    metrics.weighted_sum() / opponent_field_tilt
}

// ---------------------------------------------------------------------------
// Batch model
// ---------------------------------------------------------------------------

/// One row's FTPI breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtpiScore {
    pub compactness_factor: f64,
    pub offensive_output: f64,
    pub ftpi: f64,
}

/// Learned metric weights plus the columns they are applied with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FtpiModel {
    pub offensive_weights: WeightTable,
    pub compactness_weights: WeightTable,
    pub field_tilt_column: String,
    pub opponent_field_tilt_column: String,
}

impl FtpiModel {
    /// Derive offensive and compactness weights from the full table.
    pub fn fit(table: &MetricTable, config: &FtpiConfig) -> ScoreResult<Self> {
        let offensive: Vec<&str> = config.offensive_metrics.iter().map(String::as_str).collect();
        let compactness: Vec<&str> = config
            .compactness_metrics
            .iter()
            .map(String::as_str)
            .collect();

        let offensive_weights = compute_weights(
            table,
            &offensive,
            &config.offensive_target,
            config.normalize_weights,
        )?;
        let compactness_weights = compute_weights(
            table,
            &compactness,
            &config.compactness_target,
            config.normalize_weights,
        )?;
        info!(
            "fitted FTPI weights: {} offensive, {} compactness metrics over {} rows",
            offensive_weights.len(),
            compactness_weights.len(),
            table.len()
        );

        Ok(FtpiModel {
            offensive_weights,
            compactness_weights,
            field_tilt_column: config.field_tilt_column.clone(),
            opponent_field_tilt_column: config.opponent_field_tilt_column.clone(),
        })
    }

    pub fn score_row(&self, row: &Row<'_>) -> ScoreResult<FtpiScore> {
        let offensive = WeightedMetrics::from_row(row, &self.offensive_weights)?;
        let compactness = WeightedMetrics::from_row(row, &self.compactness_weights)?;
        let field_tilt = row.number_or_nan(&self.field_tilt_column)?;
        let opponent_field_tilt = row.number_or_nan(&self.opponent_field_tilt_column)?;

        let offensive_output = offensive_output(&offensive);
        let compactness_factor = compactness_factor(&compactness, opponent_field_tilt);
        let ftpi = ftpi(offensive_output, compactness_factor, field_tilt)?;
        Ok(FtpiScore {
            compactness_factor,
            offensive_output,
            ftpi,
        })
    }

    /// Score every row, appending `Compactness factor`, `Offensive output`
    /// and `FTPI` after the existing columns. The first failing row aborts the
    /// batch with its index attached.
    pub fn score(&self, table: &MetricTable) -> Result<MetricTable, IndexError> {
        table.require_columns(
            self.offensive_weights
                .metrics()
                .chain(self.compactness_weights.metrics())
                .chain([
                    self.field_tilt_column.as_str(),
                    self.opponent_field_tilt_column.as_str(),
                ]),
        )?;

        let mut compactness = Vec::with_capacity(table.len());
        let mut offensive = Vec::with_capacity(table.len());
        let mut index = Vec::with_capacity(table.len());
        for row in table.rows() {
            let score = self.score_row(&row).map_err(|e| e.at_row(row.index()))?;
            compactness.push(Value::Number(score.compactness_factor));
            offensive.push(Value::Number(score.offensive_output));
            index.push(Value::Number(score.ftpi));
        }

        let mut out = table.clone();
        out.set_column(COMPACTNESS_FACTOR_COLUMN, compactness)?;
        out.set_column(OFFENSIVE_OUTPUT_COLUMN, offensive)?;
        out.set_column(FTPI_COLUMN, index)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
