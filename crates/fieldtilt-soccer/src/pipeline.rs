// Batch pipelines: one function per index, each running the explicit stages
// fit/normalize -> adjust -> score -> assemble over an in-memory table.
// Reading inputs and writing outputs is left to the caller.

use serde::Serialize;
use tracing::info;

use fieldtilt_core::league::{compute_adjustment_factors, AdjustmentFactorTable, AdjustmentOptions};
use fieldtilt_core::table::MetricTable;
use fieldtilt_core::weights::WeightTable;

use crate::config::{FtpiConfig, RolesConfig};
use crate::error::IndexError;
use crate::ftpi::FtpiModel;
use crate::pbs::{press_breaking_scores, PbsNormalization, PbsParams};
use crate::role_config::RoleSet;
use crate::roles::{
    assemble_role_table, normalize_for_roles, score_roles, score_roles_adjusted, RoleLayout,
    RoleScores,
};

/// What a run derived along the way, for the JSON run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "index", rename_all = "snake_case")]
pub enum RunReport {
    Ftpi {
        rows: usize,
        offensive_weights: WeightTable,
        compactness_weights: WeightTable,
    },
    Pbs {
        rows: usize,
        params: PbsParams,
        normalization: PbsNormalization,
    },
    Roles {
        rows: usize,
        group: String,
        scored_roles: Vec<String>,
        failed_roles: Vec<FailedRole>,
        #[serde(skip_serializing_if = "Option::is_none")]
        adjustment_factors: Option<AdjustmentFactorTable>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRole {
    pub role: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub table: MetricTable,
    pub report: RunReport,
}

/// Fit FTPI weights on the table, then score every row.
pub fn run_ftpi(table: &MetricTable, config: &FtpiConfig) -> Result<PipelineOutput, IndexError> {
    let model = FtpiModel::fit(table, config)?;
    let scored = model.score(table)?;
    info!("computed FTPI for {} rows", scored.len());
    Ok(PipelineOutput {
        table: scored,
        report: RunReport::Ftpi {
            rows: table.len(),
            offensive_weights: model.offensive_weights,
            compactness_weights: model.compactness_weights,
        },
    })
}

/// Score every action's press-breaking value relative to the batch.
pub fn run_pbs(table: &MetricTable, params: &PbsParams) -> Result<PipelineOutput, IndexError> {
    let out = press_breaking_scores(table, params)?;
    info!("computed PBS for {} actions", out.table.len());
    Ok(PipelineOutput {
        table: out.table,
        report: RunReport::Pbs {
            rows: table.len(),
            params: *params,
            normalization: out.normalization,
        },
    })
}

/// Normalize the role metrics and score every role (summary layout).
pub fn run_roles(
    table: &MetricTable,
    roles: &RoleSet,
    config: &RolesConfig,
) -> Result<PipelineOutput, IndexError> {
    let normalized = normalize_for_roles(table, roles)?;
    let scores = score_roles(&normalized, roles);
    let scored = assemble_role_table(table, &scores, &RoleLayout::summary(config))?;
    Ok(PipelineOutput {
        table: scored,
        report: roles_report(table, roles, &scores, None),
    })
}

/// Normalize the role metrics, rebase them onto the baseline league using the
/// league summary, and score every role (full layout).
pub fn run_roles_adjusted(
    table: &MetricTable,
    league_summary: &MetricTable,
    roles: &RoleSet,
    config: &RolesConfig,
) -> Result<PipelineOutput, IndexError> {
    let options = AdjustmentOptions {
        league_column: config.league_column.clone(),
        excluded_columns: config.adjustment_excluded_columns.clone(),
    };
    let factors = compute_adjustment_factors(league_summary, &config.baseline_league, &options)?;
    info!(
        "adjustment factors for {} leagues against baseline `{}`",
        factors.leagues().count(),
        factors.baseline()
    );

    let normalized = normalize_for_roles(table, roles)?;
    let scores = score_roles_adjusted(&normalized, roles, &factors, &config.league_column);
    let scored = assemble_role_table(table, &scores, &RoleLayout::full(config))?;
    Ok(PipelineOutput {
        table: scored,
        report: roles_report(table, roles, &scores, Some(factors)),
    })
}

fn roles_report(
    table: &MetricTable,
    roles: &RoleSet,
    scores: &RoleScores,
    adjustment_factors: Option<AdjustmentFactorTable>,
) -> RunReport {
    RunReport::Roles {
        rows: table.len(),
        group: roles.name.clone(),
        scored_roles: scores
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(role, _)| role.to_string())
            .collect(),
        failed_roles: scores
            .failures()
            .map(|(role, err)| FailedRole {
                role: role.to_string(),
                error: err.to_string(),
            })
            .collect(),
        adjustment_factors,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
