// Integration tests for the index pipelines.
//
// These run each pipeline end-to-end against the CSV fixtures, using the
// built-in configuration, and check the shape and content of the output
// tables and run reports.

use std::path::{Path, PathBuf};

use fieldtilt_core::{MetricTable, ScoreError, Value, WeightTable};
use fieldtilt_soccer::config::{load_config, Config};
use fieldtilt_soccer::ftpi::{COMPACTNESS_FACTOR_COLUMN, FTPI_COLUMN, OFFENSIVE_OUTPUT_COLUMN};
use fieldtilt_soccer::pbs::{PbsParams, PBS_COLUMN, Z_LINE_BREAK_COLUMN, Z_OPV_COLUMN, Z_POSSESSION_VALUE_COLUMN};
use fieldtilt_soccer::role_config::{Role, RoleGroup};
use fieldtilt_soccer::{run_ftpi, run_pbs, run_roles, run_roles_adjusted, RunReport};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn fixture(name: &str) -> MetricTable {
    MetricTable::read_csv(&Path::new(FIXTURES).join(name))
        .unwrap_or_else(|e| panic!("failed to load fixture {name}: {e}"))
}

/// Default configuration written into a scratch directory.
fn default_config(name: &str) -> Config {
    let tmp = std::env::temp_dir().join(format!("fieldtilt_it_{name}"));
    let _ = std::fs::remove_dir_all(&tmp);
    let config = load_config(&tmp).expect("default config should load");
    let _ = std::fs::remove_dir_all(&tmp);
    config
}

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn numbers(table: &MetricTable, column: &str) -> Vec<f64> {
    table
        .numeric_column(column)
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

// ===========================================================================
// FTPI
// ===========================================================================

#[test]
fn ftpi_pipeline_scores_every_match() {
    let config = default_config("ftpi");
    let matches = fixture("matches.csv");
    let out = run_ftpi(&matches, &config.ftpi).unwrap();

    let n = matches.columns().len();
    assert_eq!(&out.table.columns()[..n], matches.columns());
    assert_eq!(
        &out.table.columns()[n..],
        &[COMPACTNESS_FACTOR_COLUMN, OFFENSIVE_OUTPUT_COLUMN, FTPI_COLUMN]
    );
    assert_eq!(out.table.values("Team").unwrap(), matches.values("Team").unwrap());

    let compactness = numbers(&out.table, COMPACTNESS_FACTOR_COLUMN);
    let offensive = numbers(&out.table, OFFENSIVE_OUTPUT_COLUMN);
    let index = numbers(&out.table, FTPI_COLUMN);
    let tilt = numbers(&matches, "field_tilt");
    for i in 0..matches.len() {
        assert!(index[i].is_finite());
        assert!(approx_eq(index[i], offensive[i] / (compactness[i] * tilt[i]), 1e-9));
    }

    match &out.report {
        RunReport::Ftpi {
            rows,
            offensive_weights,
            compactness_weights,
        } => {
            assert_eq!(*rows, matches.len());
            assert_eq!(offensive_weights.len(), config.ftpi.offensive_metrics.len());
            assert!(approx_eq(offensive_weights.total(), 1.0, 1e-9));
            assert!(approx_eq(compactness_weights.total(), 1.0, 1e-9));
        }
        other => panic!("expected FTPI report, got {other:?}"),
    }
}

#[test]
fn ftpi_report_serializes_weights_in_order() {
    let config = default_config("ftpi_report");
    let out = run_ftpi(&fixture("matches.csv"), &config.ftpi).unwrap();
    let json = serde_json::to_value(&out.report).unwrap();
    assert_eq!(json["index"], "ftpi");
    let weights = json["offensive_weights"].as_object().unwrap();
    assert_eq!(weights.len(), config.ftpi.offensive_metrics.len());
    assert!(weights.contains_key("xG"));
}

// ===========================================================================
// PBS
// ===========================================================================

#[test]
fn pbs_two_action_example() {
    let actions = fixture("actions.csv");
    let out = run_pbs(&actions, &PbsParams::default()).unwrap();
    let table = &out.table;

    // Components: line break 6 and 5, value change 0.1 and 0.05, opv 3 and 4.
    // With two rows every sample z-score is +-1/sqrt(2).
    let half = std::f64::consts::FRAC_1_SQRT_2;
    let zl = numbers(table, Z_LINE_BREAK_COLUMN);
    let zp = numbers(table, Z_POSSESSION_VALUE_COLUMN);
    let zo = numbers(table, Z_OPV_COLUMN);
    assert!(approx_eq(zl[0], half, 1e-12) && approx_eq(zl[1], -half, 1e-12));
    assert!(approx_eq(zp[0], half, 1e-12) && approx_eq(zp[1], -half, 1e-12));
    assert!(approx_eq(zo[0], -half, 1e-12) && approx_eq(zo[1], half, 1e-12));

    let pbs = numbers(table, PBS_COLUMN);
    assert!(approx_eq(pbs[0], half, 1e-12));
    assert!(approx_eq(pbs[1], -half, 1e-12));

    match &out.report {
        RunReport::Pbs { normalization, .. } => {
            assert!(approx_eq(normalization.opv.mean, 3.5, 1e-12));
            assert!(approx_eq(normalization.line_break_value_daf.mean, 5.5, 1e-12));
        }
        other => panic!("expected PBS report, got {other:?}"),
    }
}

// ===========================================================================
// Role scores
// ===========================================================================

#[test]
fn outfield_roles_summary_layout() {
    let config = default_config("outfield");
    let players = fixture("outfield_players.csv");
    let roles = config.role_catalog.group(RoleGroup::Outfield);
    let out = run_roles(&players, roles, &config.roles).unwrap();

    let columns = out.table.columns();
    assert_eq!(
        &columns[..7],
        &["Player", "Nation", "Pos", "Squad", "Age", "Born", "Mins"]
    );
    assert_eq!(columns.len(), 7 + 23);
    assert_eq!(columns[7], "Ball playing CB");
    assert_eq!(out.table.len(), players.len());
    assert_eq!(out.table.values("Mins").unwrap(), players.values("Mins").unwrap());

    // The last player has no xA: roles using xA are NaN for her, others are not.
    let last = players.len() - 1;
    assert!(numbers(&out.table, "Advanced playmaker")[last].is_nan());
    assert!(numbers(&out.table, "Ball playing CB")[last].is_finite());
    assert!(numbers(&out.table, "Advanced playmaker")[0].is_finite());

    match &out.report {
        RunReport::Roles {
            scored_roles,
            failed_roles,
            adjustment_factors,
            ..
        } => {
            assert_eq!(scored_roles.len(), 23);
            assert!(failed_roles.is_empty());
            assert!(adjustment_factors.is_none());
        }
        other => panic!("expected roles report, got {other:?}"),
    }
}

#[test]
fn invalid_role_in_batch_leaves_siblings_intact() {
    let config = default_config("invalid_role");
    let players = fixture("outfield_players.csv");
    let mut roles = config.role_catalog.outfield.clone();
    roles.roles.insert(
        1,
        Role::new(
            "Unbalanced",
            WeightTable::from_pairs([("Sh", 0.5), ("Gls", 0.47)]),
        ),
    );

    let out = run_roles(&players, &roles, &config.roles).unwrap();
    assert_eq!(out.table.columns()[8], "Unbalanced");
    assert!(out.table.values("Unbalanced").unwrap().iter().all(Value::is_missing));
    assert!(numbers(&out.table, "Ball playing CB").iter().all(|v| v.is_finite()));
    assert!(numbers(&out.table, "Defensive CB").iter().all(|v| v.is_finite()));

    match &out.report {
        RunReport::Roles {
            scored_roles,
            failed_roles,
            ..
        } => {
            assert_eq!(scored_roles.len(), 23);
            assert_eq!(failed_roles.len(), 1);
            assert_eq!(failed_roles[0].role, "Unbalanced");
            assert!(failed_roles[0].error.contains("sum to 1"));
        }
        other => panic!("expected roles report, got {other:?}"),
    }
}

#[test]
fn goalkeeper_roles() {
    let config = default_config("goalkeeper");
    let keepers = fixture("goalkeepers.csv");
    let roles = config.role_catalog.group(RoleGroup::Goalkeeper);
    let out = run_roles(&keepers, roles, &config.roles).unwrap();
    assert_eq!(out.table.columns().last().unwrap(), "Shot stopping distributor");

    // z-scored inputs with weights summing to one: scores average to zero.
    let scores = numbers(&out.table, "Shot stopping distributor");
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    assert!(approx_eq(mean, 0.0, 1e-9));
}

#[test]
fn role_metric_missing_from_table_fails_the_run() {
    let config = default_config("gk_on_outfield");
    let players = fixture("outfield_players.csv");
    let roles = config.role_catalog.group(RoleGroup::Goalkeeper);
    let err = run_roles(&players, roles, &config.roles).unwrap_err();
    match err {
        fieldtilt_soccer::IndexError::Score(ScoreError::MissingColumn { columns }) => {
            assert!(columns.contains(&"PSxG+/-".to_string()));
            assert!(columns.contains(&"Save%".to_string()));
        }
        other => panic!("expected MissingColumn, got: {other}"),
    }
}

#[test]
fn league_adjusted_roles_full_layout() {
    let config = default_config("adjusted");
    let players = fixture("outfield_players.csv");
    let summary = fixture("league_summary.csv");
    let roles = config.role_catalog.group(RoleGroup::Outfield);
    let out = run_roles_adjusted(&players, &summary, roles, &config.roles).unwrap();

    let columns = out.table.columns();
    assert_eq!(
        &columns[..7],
        &["Player", "Nation", "Age", "Mins", "League", "Squad", "Pos"]
    );
    assert_eq!(columns.len(), players.columns().len() + 23);
    assert_eq!(columns.last().unwrap(), "Link-up striker");

    match &out.report {
        RunReport::Roles {
            adjustment_factors: Some(factors),
            failed_roles,
            ..
        } => {
            assert!(failed_roles.is_empty());
            assert_eq!(factors.baseline(), "Mean");
            let leagues: Vec<&str> = factors.leagues().collect();
            assert_eq!(leagues, vec!["Liga F", "NWSL", "WSL"]);
            // Mins is excluded from the summary metrics.
            assert_eq!(factors.factor("WSL", "Mins"), 1.0);
        }
        other => panic!("expected adjusted roles report, got {other:?}"),
    }
}

#[test]
fn adjusted_run_with_unknown_baseline() {
    let mut config = default_config("unknown_baseline");
    config.roles.baseline_league = "UWCL".into();
    let err = run_roles_adjusted(
        &fixture("outfield_players.csv"),
        &fixture("league_summary.csv"),
        &config.role_catalog.outfield,
        &config.roles,
    )
    .unwrap_err();
    assert!(err.to_string().contains("UWCL"));
}

// ===========================================================================
// CSV output
// ===========================================================================

#[test]
fn scored_table_round_trips_through_csv() {
    let config = default_config("round_trip");
    let players = fixture("outfield_players.csv");
    let out = run_roles(&players, &config.role_catalog.outfield, &config.roles).unwrap();

    let path: PathBuf = std::env::temp_dir().join("fieldtilt_it_round_trip.csv");
    out.table.write_csv(&path).unwrap();
    let reloaded = MetricTable::read_csv(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(reloaded.columns(), out.table.columns());
    assert_eq!(reloaded.values("Player").unwrap(), out.table.values("Player").unwrap());
    // NaN scores are written as "NaN" and load back as missing.
    let last = players.len() - 1;
    assert!(reloaded.row(last).unwrap().number("Advanced playmaker").unwrap().is_none());
}
