//! Sink: writes the cleaned orders and the aggregates.
//!
//! Outputs are first written into a hidden staging directory inside the
//! output directory. Only when every file has been written are they renamed
//! into place. Files from the previous run are moved aside first and put
//! back if any move fails, so the output directory holds either the whole
//! new set or the whole old one.

use crate::config::{ParquetCodec, PipelineConfig};
use crate::error::{EtlError, Result, ResultExt as _};
use crate::frame::{
    customer_spend_to_frame, monthly_revenue_to_frame, orders_from_frame, orders_to_frame,
    require_column, text_values,
};
use crate::model::{ORDER_ID, Order};
use crate::source::read_csv;
use crate::transform::Aggregates;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Datetime format used in the row-oriented outputs.
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One file the sink produces.
pub enum Artifact {
    Csv { name: String, frame: DataFrame },
    Parquet { name: String, frame: DataFrame },
}

impl Artifact {
    fn name(&self) -> &str {
        match self {
            Self::Csv { name, .. } | Self::Parquet { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Size of the row-oriented versus the columnar cleaned orders file.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SizeComparison {
    pub csv_kb: f64,
    pub parquet_kb: f64,
}

impl SizeComparison {
    /// How many times smaller the parquet file is; `None` for an empty parquet file.
    pub fn ratio(&self) -> Option<f64> {
        (self.parquet_kb > 0.0).then(|| self.csv_kb / self.parquet_kb)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkReport {
    pub files: Vec<WrittenFile>,
    pub size_comparison: Option<SizeComparison>,
}

/// Write the two cleaned-orders files.
pub fn cleaned_order_artifacts(config: &PipelineConfig, orders: &[Order]) -> Result<Vec<Artifact>> {
    let frame = orders_to_frame(orders)?;
    Ok(vec![
        Artifact::Csv {
            name: config.outputs.orders_csv.clone(),
            frame: frame.clone(),
        },
        Artifact::Parquet {
            name: config.outputs.orders_parquet.clone(),
            frame,
        },
    ])
}

/// Every artifact of a full run: both aggregate tables plus the cleaned orders.
pub fn all_artifacts(
    config: &PipelineConfig,
    orders: &[Order],
    aggregates: &Aggregates,
) -> Result<Vec<Artifact>> {
    let mut artifacts = vec![
        Artifact::Csv {
            name: config.outputs.customer_spend.clone(),
            frame: customer_spend_to_frame(&aggregates.customer_spend)?,
        },
        Artifact::Csv {
            name: config.outputs.monthly_revenue.clone(),
            frame: monthly_revenue_to_frame(&aggregates.monthly_revenue)?,
        },
    ];
    artifacts.extend(cleaned_order_artifacts(config, orders)?);
    Ok(artifacts)
}

/// Stage every artifact, then move them all into the output directory.
pub fn write_artifacts(config: &PipelineConfig, artifacts: Vec<Artifact>) -> Result<SinkReport> {
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".orders-etl-staging-")
        .tempdir_in(output_dir)
        .context("Failed to create staging directory")?;

    let mut staged = Vec::with_capacity(artifacts.len());
    for mut artifact in artifacts {
        let path = staging.path().join(artifact.name());
        write_artifact(config, &mut artifact, &path)?;
        tracing::debug!(path = %path.display(), "Staged output");
        staged.push((path, output_dir.join(artifact.name())));
    }

    let previous = staging.path().join(".previous");
    std::fs::create_dir(&previous).context("Failed to create backup directory")?;
    install(&staged, &previous)?;

    let mut files = Vec::with_capacity(staged.len());
    for (_, to) in staged {
        let bytes = std::fs::metadata(&to)?.len();
        tracing::info!(path = %to.display(), bytes, "Wrote output");
        files.push(WrittenFile { path: to, bytes });
    }

    let size_comparison = size_comparison(config, &files);
    Ok(SinkReport {
        files,
        size_comparison,
    })
}

/// Move staged files over their targets. Any file already at a target is
/// first moved into `previous`; if a later move fails, every target touched
/// so far is put back the way it was.
fn install(staged: &[(PathBuf, PathBuf)], previous: &Path) -> Result<()> {
    let mut installed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    for (from, to) in staged {
        match install_one(from, to, previous) {
            Ok(backup) => installed.push((to.as_path(), backup)),
            Err(err) => {
                restore(&installed);
                return Err(err);
            }
        }
    }
    Ok(())
}

fn install_one(from: &Path, to: &Path, previous: &Path) -> Result<Option<PathBuf>> {
    let backup = if to.exists() {
        let name = to.file_name().ok_or_else(|| {
            EtlError::Other(format!("Output path has no file name: {}", to.display()))
        })?;
        let backup = previous.join(name);
        std::fs::rename(to, &backup)
            .with_context(|| format!("Failed to move previous output aside: {}", to.display()))?;
        Some(backup)
    } else {
        None
    };

    if let Err(err) = std::fs::rename(from, to) {
        restore(&[(to, backup)]);
        return Err(EtlError::Io(err))
            .with_context(|| format!("Failed to move output into place: {}", to.display()));
    }
    Ok(backup)
}

fn restore(installed: &[(&Path, Option<PathBuf>)]) {
    for (target, backup) in installed.iter().rev() {
        let result = match backup {
            Some(backup) => std::fs::rename(backup, target),
            None if target.exists() => std::fs::remove_file(target),
            None => Ok(()),
        };
        if let Err(err) = result {
            tracing::error!(path = %target.display(), "Failed to restore previous output: {err}");
        }
    }
}

fn write_artifact(config: &PipelineConfig, artifact: &mut Artifact, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    match artifact {
        Artifact::Csv { frame, .. } => {
            CsvWriter::new(file)
                .include_header(true)
                .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_owned()))
                .finish(frame)
                .context("Failed to write CSV file")?;
        }
        Artifact::Parquet { frame, .. } => {
            ParquetWriter::new(file)
                .with_compression(parquet_compression(config.parquet_codec))
                .with_row_group_size(Some(config.effective_row_group_size()))
                .finish(frame)
                .context("Failed to write Parquet file")?;
        }
    }
    Ok(())
}

fn parquet_compression(codec: ParquetCodec) -> ParquetCompression {
    match codec {
        ParquetCodec::Snappy => ParquetCompression::Snappy,
        ParquetCodec::Zstd => ParquetCompression::Zstd(None),
        ParquetCodec::Uncompressed => ParquetCompression::Uncompressed,
    }
}

fn size_comparison(config: &PipelineConfig, files: &[WrittenFile]) -> Option<SizeComparison> {
    let size_of = |name: &str| {
        files
            .iter()
            .find(|f| f.path.file_name().is_some_and(|n| n == name))
            .map(|f| f.bytes as f64 / 1024.0)
    };
    Some(SizeComparison {
        csv_kb: size_of(&config.outputs.orders_csv)?,
        parquet_kb: size_of(&config.outputs.orders_parquet)?,
    })
}

/// Write a JSON document next to the outputs, replacing any previous one
/// atomically.
pub fn write_json(path: &Path, json: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path)
        .map_err(|e| EtlError::Io(e.error))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }
    let file = File::open(path)?;
    ParquetReader::new(file)
        .finish()
        .with_context(|| format!("Failed to read Parquet: {}", path.display()))
}

/// Result of reading both cleaned-orders outputs back.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub csv_rows: usize,
    pub parquet_rows: usize,
    pub columns_match: bool,
    pub ids_match: bool,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.csv_rows == self.parquet_rows && self.columns_match && self.ids_match
    }
}

/// Read the cleaned orders back from both formats and compare them.
pub fn verify_outputs(config: &PipelineConfig) -> Result<VerifyReport> {
    let csv = read_csv(&config.output_dir.join(&config.outputs.orders_csv), true)?;
    let parquet = read_parquet(&config.output_dir.join(&config.outputs.orders_parquet))?;

    // Typed read-back doubles as a schema check on the parquet file.
    let orders = orders_from_frame(&parquet)?;

    let csv_ids = text_values(require_column(&csv, "cleaned orders csv", ORDER_ID)?)?;
    let parquet_ids: Vec<Option<String>> =
        orders.into_iter().map(|o| Some(o.order_id)).collect();

    Ok(VerifyReport {
        csv_rows: csv.height(),
        parquet_rows: parquet.height(),
        columns_match: csv.get_column_names() == parquet.get_column_names(),
        ids_match: csv_ids == parquet_ids,
    })
}
