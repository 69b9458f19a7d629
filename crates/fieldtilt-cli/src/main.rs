// fieldtilt command-line entry point.
//
// Run sequence:
// 1. Parse arguments
// 2. Initialize tracing (stderr, or a log file)
// 3. Load config (writing defaults into config/ on first run)
// 4. Read the input CSV
// 5. Run the selected index pipeline
// 6. Write the scored CSV and, if asked, the JSON run report

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use fieldtilt_core::MetricTable;
use fieldtilt_soccer::config::{self, Config};
use fieldtilt_soccer::pbs::PbsParams;
use fieldtilt_soccer::role_config::RoleGroup;
use fieldtilt_soccer::{run_ftpi, run_pbs, run_roles, run_roles_adjusted, PipelineOutput, RunReport};

#[derive(Debug, Parser)]
#[command(name = "fieldtilt")]
#[command(about = "Soccer performance indices from tabular match and player data", long_about = None)]
struct Cli {
    /// Directory holding config/ (created with defaults if missing)
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the default config files and exit
    Init,

    /// Final Third Productivity Index, one score per match row
    Ftpi {
        /// Match-level input CSV
        #[arg(long)]
        input: PathBuf,

        /// Scored output CSV
        #[arg(long)]
        output: PathBuf,

        /// JSON run report (fitted weights)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Press Breaking Score, one score per on-ball action
    Pbs {
        /// Action-level input CSV
        #[arg(long)]
        input: PathBuf,

        /// Scored output CSV
        #[arg(long)]
        output: PathBuf,

        /// Override the proximity radius from config
        #[arg(long)]
        radius: Option<f64>,

        /// Override the density factor used when no opponents remain
        #[arg(long)]
        max_density: Option<f64>,

        /// JSON run report (component means and deviations)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Tactical role scores, one column per role
    Roles {
        /// Player-level input CSV
        #[arg(long)]
        input: PathBuf,

        /// Scored output CSV
        #[arg(long)]
        output: PathBuf,

        /// Role group to score: outfield or goalkeeper
        #[arg(long, default_value = "outfield")]
        group: RoleGroup,

        /// League summary CSV; enables league-adjusted scoring
        #[arg(long)]
        league_summary: Option<PathBuf>,

        /// Override the baseline league from config
        #[arg(long, requires = "league_summary")]
        baseline: Option<String>,

        /// JSON run report (scored roles, failures, adjustment factors)
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// JSON report written next to a run's output.
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    generated_at: DateTime<Utc>,
    input: &'a Path,
    output: &'a Path,
    run: &'a RunReport,
}

fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing(cli.log_file.as_deref())?;
    info!("fieldtilt starting up");

    // 3. Load config
    if let Commands::Init = cli.command {
        let written = config::ensure_config_files(&cli.config_dir)
            .context("failed to write default configuration")?;
        if written.is_empty() {
            info!("config files already present in {}", cli.config_dir.display());
        }
        for path in written {
            info!("wrote {}", path.display());
        }
        return Ok(());
    }
    let config =
        config::load_config(&cli.config_dir).context("failed to load configuration")?;

    // 4-6. Read, score, write
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Ftpi {
            input,
            output,
            report,
        } => {
            let table = read_table(&input)?;
            let out = run_ftpi(&table, &config.ftpi).context("FTPI computation failed")?;
            finish(&input, &output, report.as_deref(), out)
        }
        Commands::Pbs {
            input,
            output,
            radius,
            max_density,
            report,
        } => {
            let params = PbsParams {
                radius: radius.unwrap_or(config.pbs.radius),
                max_density_adjustment_factor: max_density
                    .unwrap_or(config.pbs.max_density_adjustment_factor),
            };
            let table = read_table(&input)?;
            let out = run_pbs(&table, &params).context("PBS computation failed")?;
            finish(&input, &output, report.as_deref(), out)
        }
        Commands::Roles {
            input,
            output,
            group,
            league_summary,
            baseline,
            report,
        } => {
            let out = score_roles(&config, &input, group, league_summary.as_deref(), baseline)?;
            finish(&input, &output, report.as_deref(), out)
        }
    }
}

fn score_roles(
    config: &Config,
    input: &Path,
    group: RoleGroup,
    league_summary: Option<&Path>,
    baseline: Option<String>,
) -> anyhow::Result<PipelineOutput> {
    let roles = config.role_catalog.group(group);
    if roles.is_empty() {
        anyhow::bail!("no {group} roles are configured");
    }
    let table = read_table(input)?;

    match league_summary {
        None => run_roles(&table, roles, &config.roles)
            .with_context(|| format!("{group} role scoring failed")),
        Some(summary_path) => {
            let summary = read_table(summary_path)?;
            let mut roles_config = config.roles.clone();
            if let Some(league) = baseline {
                roles_config.baseline_league = league;
            }
            run_roles_adjusted(&table, &summary, roles, &roles_config)
                .with_context(|| format!("league-adjusted {group} role scoring failed"))
        }
    }
}

fn read_table(path: &Path) -> anyhow::Result<MetricTable> {
    let table = MetricTable::read_csv(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    info!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    if table.is_empty() {
        warn!("{} has no data rows", path.display());
    }
    Ok(table)
}

fn finish(
    input: &Path,
    output: &Path,
    report: Option<&Path>,
    out: PipelineOutput,
) -> anyhow::Result<()> {
    out.table
        .write_csv(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {} rows to {}", out.table.len(), output.display());

    if let Some(report_path) = report {
        let file = File::create(report_path)
            .with_context(|| format!("failed to create {}", report_path.display()))?;
        let doc = ReportFile {
            generated_at: Utc::now(),
            input,
            output,
            run: &out.report,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &doc)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        info!("wrote run report to {}", report_path.display());
    }
    Ok(())
}

/// Initialize tracing to stderr, or to `log_file` when given.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let (writer, ansi) = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            (BoxMakeWriter::new(file), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fieldtilt=info,warn")),
        )
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
