use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use orders_etl::config::PipelineConfig;
use orders_etl::pipeline::{RunMode, log_report, run_pipeline, verify_run};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "orders-etl",
    version,
    about = "Clean e-commerce orders and report on them"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Directory holding the raw CSV inputs
    #[arg(short, long, env = "ORDERS_ETL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving the outputs
    #[arg(short, long, env = "ORDERS_ETL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to a JSON pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the rolling file log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and write every output
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of top customers to report
        #[arg(long)]
        top: Option<usize>,

        /// Also write the run report as JSON next to the outputs
        #[arg(long)]
        summary_json: bool,
    },
    /// Clean the orders and write only the cleaned tables
    Clean {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Load and analyse the inputs without writing anything
    Inspect {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check that the CSV and parquet cleaned orders agree
    Verify {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Run { common, .. }
            | Self::Clean { common }
            | Self::Inspect { common }
            | Self::Verify { common } => common,
        }
    }
}

/// Merge the configuration file (if any) with the command-line overrides.
pub fn resolve_config(command: &Commands) -> Result<PipelineConfig> {
    let common = command.common();
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &common.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(dir) = &common.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(dir) = &common.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Commands::Run {
        top, summary_json, ..
    } = command
    {
        if let Some(top) = top {
            config.top_customers = *top;
        }
        config.write_run_summary |= *summary_json;
    }

    config.validate()?;
    Ok(config)
}

pub fn run_command(command: &Commands, config: &PipelineConfig) -> Result<()> {
    match command {
        Commands::Run { .. } => {
            let report = run_pipeline(config, RunMode::Full)?;
            log_report(&report);
        }
        Commands::Clean { .. } => {
            let report = run_pipeline(config, RunMode::CleanOnly)?;
            log_report(&report);
        }
        Commands::Inspect { .. } => {
            let report = run_pipeline(config, RunMode::DryRun)?;
            log_report(&report);
        }
        Commands::Verify { .. } => {
            let report = verify_run(config)?;
            if !report.is_consistent() {
                anyhow::bail!(
                    "Cleaned outputs disagree: csv rows {}, parquet rows {}, columns match {}, ids match {}",
                    report.csv_rows,
                    report.parquet_rows,
                    report.columns_match,
                    report.ids_match
                );
            }
        }
    }
    Ok(())
}
