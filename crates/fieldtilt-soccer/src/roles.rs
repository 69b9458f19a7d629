// Role scoring: weighted composites of z-scored player metrics.
//
// Every role is scored independently. A role that fails (bad weight sum,
// missing metric) is recorded as an error and rendered as an empty column,
// while its siblings are still scored.

use tracing::{info, warn};

use fieldtilt_core::composite::{weighted_sum, WeightedMetrics};
use fieldtilt_core::error::{ScoreError, ScoreResult};
use fieldtilt_core::league::{apply_adjustment, AdjustmentFactorTable};
use fieldtilt_core::normalize::normalize;
use fieldtilt_core::table::{MetricTable, TableError, Value};
use fieldtilt_core::weights::WeightTable;

use crate::config::RolesConfig;
use crate::role_config::RoleSet;

/// Authored role weights must sum to 1 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

pub fn check_weight_sum(weights: &WeightTable) -> ScoreResult<()> {
    let total = weights.total();
    if (1.0 - WEIGHT_SUM_TOLERANCE..=1.0 + WEIGHT_SUM_TOLERANCE).contains(&total) {
        Ok(())
    } else {
        Err(ScoreError::WeightSum { total })
    }
}

// ---------------------------------------------------------------------------
// Single-role scoring
// ---------------------------------------------------------------------------

/// Weighted sum of the role's metrics for every row.
///
/// Missing cells read as NaN, so a player lacking any role metric gets a NaN
/// score for that role. Missing cells are not skipped or read as zero.
pub fn role_score(table: &MetricTable, weights: &WeightTable) -> ScoreResult<Vec<f64>> {
    check_weight_sum(weights)?;
    table.require_columns(weights.metrics())?;
    table
        .rows()
        .map(|row| -> ScoreResult<f64> {
            Ok(WeightedMetrics::from_row(&row, weights)?.weighted_sum())
        })
        .collect()
}

/// Like `role_score`, but every metric value is first multiplied by the
/// league factor of the player's league. Weight sums are not checked here.
pub fn role_score_adjusted(
    table: &MetricTable,
    weights: &WeightTable,
    factors: &AdjustmentFactorTable,
    league_column: &str,
) -> ScoreResult<Vec<f64>> {
    table.require_columns(weights.metrics().chain([league_column]))?;
    let metrics: Vec<&str> = weights.metrics().collect();
    table
        .rows()
        .map(|row| -> ScoreResult<f64> {
            let adjusted = apply_adjustment(&row, &metrics, factors, league_column)?;
            Ok(weighted_sum(weights.iter().map(|(metric, weight)| {
                let value = adjusted.get(metric).copied().flatten();
                (value.unwrap_or(f64::NAN), weight)
            })))
        })
        .collect()
}

/// Z-score every metric used by any role in the set.
pub fn normalize_for_roles(table: &MetricTable, roles: &RoleSet) -> ScoreResult<MetricTable> {
    normalize(table, &roles.metrics())
}

// ---------------------------------------------------------------------------
// Batch scoring
// ---------------------------------------------------------------------------

/// Per-role outcome of a batch, in role order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleScores {
    entries: Vec<(String, ScoreResult<Vec<f64>>)>,
}

impl RoleScores {
    pub fn push(&mut self, role: &str, result: ScoreResult<Vec<f64>>) {
        self.entries.push((role.to_string(), result));
    }

    pub fn get(&self, role: &str) -> Option<&ScoreResult<Vec<f64>>> {
        self.entries.iter().find(|(r, _)| r == role).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScoreResult<Vec<f64>>)> + '_ {
        self.entries.iter().map(|(r, s)| (r.as_str(), s))
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(r, _)| r.as_str())
    }

    /// Roles that could not be scored, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ScoreError)> + '_ {
        self.entries
            .iter()
            .filter_map(|(r, s)| s.as_ref().err().map(|e| (r.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn score_each<F>(roles: &RoleSet, mut score: F) -> RoleScores
where
    F: FnMut(&WeightTable) -> ScoreResult<Vec<f64>>,
{
    let mut scores = RoleScores::default();
    for role in &roles.roles {
        let result = score(&role.weights);
        if let Err(e) = &result {
            warn!("error calculating {} score: {}", role.name, e);
        }
        scores.push(&role.name, result);
    }
    let failed = scores.failures().count();
    info!(
        "scored {} of {} {} roles",
        scores.len() - failed,
        scores.len(),
        roles.name
    );
    scores
}

/// Score every role in the set against an (already normalized) table.
pub fn score_roles(table: &MetricTable, roles: &RoleSet) -> RoleScores {
    score_each(roles, |weights| role_score(table, weights))
}

/// Score every role with league-adjusted metric values.
pub fn score_roles_adjusted(
    table: &MetricTable,
    roles: &RoleSet,
    factors: &AdjustmentFactorTable,
    league_column: &str,
) -> RoleScores {
    score_each(roles, |weights| {
        role_score_adjusted(table, weights, factors, league_column)
    })
}

// ---------------------------------------------------------------------------
// Output assembly
// ---------------------------------------------------------------------------

/// Column layout of a role score table.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleLayout {
    /// Player, the listed metadata columns present in the source, then one
    /// column per role.
    Summary {
        player_column: String,
        metadata_columns: Vec<String>,
    },
    /// The listed metadata columns present in the source, every other source
    /// column in order, then one column per role. Metric columns carry the
    /// source table's values in source units, not z-scores.
    Full { metadata_columns: Vec<String> },
}

impl RoleLayout {
    pub fn summary(config: &RolesConfig) -> Self {
        RoleLayout::Summary {
            player_column: config.player_column.clone(),
            metadata_columns: config.summary_columns.clone(),
        }
    }

    pub fn full(config: &RolesConfig) -> Self {
        RoleLayout::Full {
            metadata_columns: config.full_metadata_columns.clone(),
        }
    }

    fn source_columns<'a>(&self, source: &'a MetricTable, roles: &[&str]) -> Vec<&'a str> {
        let mut columns: Vec<&'a str> = Vec::new();
        let take = |name: &str, columns: &mut Vec<&'a str>| {
            if let Some(idx) = source.column_index(name) {
                let column = source.columns()[idx].as_str();
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        };
        match self {
            RoleLayout::Summary {
                player_column,
                metadata_columns,
            } => {
                if !source.has_column(player_column) {
                    warn!("player column `{}` not found; omitted from output", player_column);
                }
                take(player_column.as_str(), &mut columns);
                for name in metadata_columns {
                    take(name.as_str(), &mut columns);
                }
            }
            RoleLayout::Full { metadata_columns } => {
                for name in metadata_columns {
                    take(name.as_str(), &mut columns);
                }
                for column in source.columns() {
                    if !roles.contains(&column.as_str()) {
                        take(column.as_str(), &mut columns);
                    }
                }
            }
        }
        columns
    }
}

/// Build the output table: layout columns copied from `source`, then one
/// column per role. Failed roles become all-missing columns.
pub fn assemble_role_table(
    source: &MetricTable,
    scores: &RoleScores,
    layout: &RoleLayout,
) -> Result<MetricTable, TableError> {
    let roles: Vec<&str> = scores.roles().collect();
    let leading = layout.source_columns(source, &roles);

    let mut columns: Vec<String> = leading.iter().map(|c| c.to_string()).collect();
    columns.extend(roles.iter().map(|r| r.to_string()));

    let mut rows = Vec::with_capacity(source.len());
    for row in source.rows() {
        let mut cells: Vec<Value> = leading
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(Value::Missing))
            .collect();
        for (_, result) in scores.iter() {
            let cell = match result {
                Ok(values) => values.get(row.index()).map_or(Value::Missing, |v| Value::Number(*v)),
                Err(_) => Value::Missing,
            };
            cells.push(cell);
        }
        rows.push(cells);
    }

    for (role, err) in scores.failures() {
        warn!("role `{}` has no scores ({}); column left empty", role, err);
    }

    MetricTable::from_rows(columns, rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
