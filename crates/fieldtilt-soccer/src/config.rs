// Configuration loading and parsing (fieldtilt.toml, roles.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use fieldtilt_core::league::DEFAULT_EXCLUDED_COLUMNS;

use crate::pbs::PbsParams;
use crate::role_config::{RoleCatalog, BUILTIN_ROLES};

/// Default files written into `config/` when absent.
const DEFAULT_FILES: &[(&str, &str)] = &[
    ("fieldtilt.toml", include_str!("../defaults/fieldtilt.toml")),
    ("roles.toml", BUILTIN_ROLES),
];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub ftpi: FtpiConfig,
    pub pbs: PbsParams,
    pub roles: RolesConfig,
    pub role_catalog: RoleCatalog,
}

// ---------------------------------------------------------------------------
// fieldtilt.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire fieldtilt.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    ftpi: FtpiConfig,
    #[serde(default)]
    pbs: PbsParams,
    #[serde(default)]
    roles: RolesConfig,
}

/// Metric selection for the FTPI weight fit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FtpiConfig {
    pub offensive_metrics: Vec<String>,
    #[serde(default = "default_offensive_target")]
    pub offensive_target: String,
    pub compactness_metrics: Vec<String>,
    #[serde(default = "default_compactness_target")]
    pub compactness_target: String,
    /// Rescale correlation weights by each metric's z-score spread.
    #[serde(default = "default_true")]
    pub normalize_weights: bool,
    #[serde(default = "default_field_tilt_column")]
    pub field_tilt_column: String,
    #[serde(default = "default_opponent_field_tilt_column")]
    pub opponent_field_tilt_column: String,
}

impl Default for FtpiConfig {
    fn default() -> Self {
        FtpiConfig {
            offensive_metrics: Vec::new(),
            offensive_target: default_offensive_target(),
            compactness_metrics: Vec::new(),
            compactness_target: default_compactness_target(),
            normalize_weights: true,
            field_tilt_column: default_field_tilt_column(),
            opponent_field_tilt_column: default_opponent_field_tilt_column(),
        }
    }
}

/// Column naming for role scoring and output layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// League summary row the other leagues are rebased to.
    pub baseline_league: String,
    pub league_column: String,
    pub player_column: String,
    /// Columns copied next to `player_column` in the summary layout.
    pub summary_columns: Vec<String>,
    /// Columns leading the full (league-adjusted) layout.
    pub full_metadata_columns: Vec<String>,
    /// League summary columns that never carry a metric mean.
    pub adjustment_excluded_columns: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        RolesConfig {
            baseline_league: "Mean".into(),
            league_column: "League".into(),
            player_column: "Player".into(),
            summary_columns: to_strings(&["Nation", "Pos", "Squad", "Age", "Born", "Mins"]),
            full_metadata_columns: to_strings(&[
                "Player", "Nation", "Age", "Mins", "League", "Squad", "Pos",
            ]),
            adjustment_excluded_columns: to_strings(DEFAULT_EXCLUDED_COLUMNS),
        }
    }
}

fn default_offensive_target() -> String {
    "goals_scored".into()
}

fn default_compactness_target() -> String {
    "least_goals_allowed".into()
}

fn default_true() -> bool {
    true
}

fn default_field_tilt_column() -> String {
    "field_tilt".into()
}

fn default_opponent_field_tilt_column() -> String {
    "opponent_field_tilt".into()
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/fieldtilt.toml` and
/// (optionally) `config/roles.toml`, relative to `base_dir`. Without a
/// roles.toml the built-in role tables are used.
///
/// Does not write defaults; `load_config` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- fieldtilt.toml (required) ---
    let settings_path = config_dir.join("fieldtilt.toml");
    let settings_text = read_file(&settings_path)?;
    let settings: SettingsFile =
        toml::from_str(&settings_text).map_err(|e| ConfigError::ParseError {
            path: settings_path.clone(),
            source: e,
        })?;

    // --- roles.toml (optional) ---
    let roles_path = config_dir.join("roles.toml");
    let role_catalog = if roles_path.exists() {
        let roles_text = read_file(&roles_path)?;
        RoleCatalog::from_toml_str(&roles_text, &roles_path)?
    } else {
        RoleCatalog::builtin()?
    };

    let config = Config {
        ftpi: settings.ftpi,
        pbs: settings.pbs,
        roles: settings.roles,
        role_catalog,
    };

    validate(&config)?;

    Ok(config)
}

/// Write any missing config file into `config/` from the built-in defaults.
/// Returns the files that were written; existing files are left untouched.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for (file_name, content) in DEFAULT_FILES {
        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                std::io::Write::write_all(&mut dest, content.as_bytes()).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Keep the user's copy
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Ensure default config files exist under `base_dir`, then load them.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    for path in ensure_config_files(base_dir)? {
        info!("wrote default config {}", path.display());
    }
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn check_metric_list(field: &str, metrics: &[String]) -> Result<(), ConfigError> {
    if metrics.is_empty() {
        return Err(invalid(field, "must list at least one metric"));
    }
    for (i, metric) in metrics.iter().enumerate() {
        if metric.trim().is_empty() {
            return Err(invalid(field, format!("entry {i} is empty")));
        }
        if metrics[..i].contains(metric) {
            return Err(invalid(field, format!("metric `{metric}` is listed twice")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // FTPI validations
    let ftpi = &config.ftpi;
    check_metric_list("ftpi.offensive_metrics", &ftpi.offensive_metrics)?;
    check_metric_list("ftpi.compactness_metrics", &ftpi.compactness_metrics)?;

    let column_fields: &[(&str, &str)] = &[
        ("ftpi.offensive_target", ftpi.offensive_target.as_str()),
        ("ftpi.compactness_target", ftpi.compactness_target.as_str()),
        ("ftpi.field_tilt_column", ftpi.field_tilt_column.as_str()),
        ("ftpi.opponent_field_tilt_column", ftpi.opponent_field_tilt_column.as_str()),
        ("roles.baseline_league", config.roles.baseline_league.as_str()),
        ("roles.league_column", config.roles.league_column.as_str()),
        ("roles.player_column", config.roles.player_column.as_str()),
    ];
    for (name, val) in column_fields {
        if val.trim().is_empty() {
            return Err(invalid(name, "must not be empty"));
        }
    }

    // PBS constants must be positive
    let pbs = &config.pbs;
    let pbs_fields: &[(&str, f64)] = &[
        ("pbs.radius", pbs.radius),
        ("pbs.max_density_adjustment_factor", pbs.max_density_adjustment_factor),
    ];
    for (name, val) in pbs_fields {
        if !val.is_finite() || *val <= 0.0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }

    config.role_catalog.validate()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
