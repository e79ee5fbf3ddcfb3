//! Pipeline execution engine.
//!
//! Drives the stages in their fixed order and collects each stage's report
//! into a [`RunReport`]. Nothing is written until every stage before the
//! sink has succeeded.

use super::report::{RunReport, log_preview};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt as _};
use crate::sink::{
    VerifyReport, all_artifacts, cleaned_order_artifacts, verify_outputs, write_artifacts,
    write_json,
};
use crate::source::load_sources;
use crate::transform::{clean_orders, compute_aggregates, normalize_orders};
use std::time::Instant;

/// How far a run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Every stage, every output
    Full,
    /// Source, cleaning and normalization; writes only the cleaned orders
    CleanOnly,
    /// Every stage except the sink; nothing is written
    DryRun,
}

impl RunMode {
    fn computes_aggregates(self) -> bool {
        matches!(self, Self::Full | Self::DryRun)
    }
}

/// Execute the pipeline.
///
/// # Errors
///
/// Fails on a missing input file or column, a column that cannot be typed,
/// or an output that cannot be written. In all those cases no output is
/// moved into the output directory.
pub fn run_pipeline(config: &PipelineConfig, mode: RunMode) -> Result<RunReport> {
    let start = Instant::now();
    config.validate()?;
    tracing::info!(?mode, data_dir = %config.data_dir.display(), "Starting orders pipeline");

    let (tables, source) = load_sources(config)?;
    for table in &source.tables {
        tracing::info!(
            table = %table.name,
            rows = table.rows,
            columns = table.columns,
            "Loaded table"
        );
    }

    let (cleaned, cleaning) = clean_orders(tables.orders);
    let (orders, normalization) = normalize_orders(cleaned)?;
    log_preview(&orders);

    let aggregates = mode
        .computes_aggregates()
        .then(|| compute_aggregates(&orders, &tables.order_items));

    let sink = match (mode, &aggregates) {
        (RunMode::Full, Some(aggregates)) => Some(write_artifacts(
            config,
            all_artifacts(config, &orders, aggregates)?,
        )?),
        (RunMode::CleanOnly, _) => Some(write_artifacts(
            config,
            cleaned_order_artifacts(config, &orders)?,
        )?),
        _ => None,
    };

    let report = RunReport {
        mode: format!("{mode:?}"),
        source,
        cleaning,
        normalization,
        aggregates,
        top_customers: config.top_customers,
        sink,
        duration: start.elapsed(),
    };

    if config.write_run_summary && mode != RunMode::DryRun {
        let path = config.output_dir.join(&config.outputs.run_summary);
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        write_json(&path, &json)?;
        tracing::info!(path = %path.display(), "Wrote run summary");
    }

    Ok(report)
}

/// Read the cleaned-orders outputs of a previous run back and compare them.
pub fn verify_run(config: &PipelineConfig) -> Result<VerifyReport> {
    let report = verify_outputs(config)?;
    if report.is_consistent() {
        tracing::info!(rows = report.parquet_rows, "CSV and parquet outputs agree");
    } else {
        tracing::warn!(?report, "CSV and parquet outputs disagree");
    }
    Ok(report)
}
