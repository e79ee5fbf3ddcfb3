//! Pipeline configuration.
//!
//! Every field has a default so a run needs no configuration file at all.
//! A JSON file may override any subset of fields, and the CLI overrides
//! the file.

use crate::error::{EtlError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the parquet row group size.
pub const PARQUET_ROW_GROUP_SIZE_ENV: &str = "ORDERS_ETL_PARQUET_ROW_GROUP_SIZE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub orders: String,
    pub order_items: String,
    pub customers: String,
    pub products: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            orders: "ecommerce_orders.csv".to_owned(),
            order_items: "ecommerce_order_items.csv".to_owned(),
            customers: "ecommerce_customers.csv".to_owned(),
            products: "ecommerce_products.csv".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub customer_spend: String,
    pub monthly_revenue: String,
    pub orders_csv: String,
    pub orders_parquet: String,
    pub run_summary: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            customer_spend: "customer_spend.csv".to_owned(),
            monthly_revenue: "monthly_revenue.csv".to_owned(),
            orders_csv: "orders_clean.csv".to_owned(),
            orders_parquet: "orders_clean.parquet".to_owned(),
            run_summary: "run_summary.json".to_owned(),
        }
    }
}

/// Compression codec for the columnar output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCodec {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the raw CSV inputs
    pub data_dir: PathBuf,

    /// Directory receiving all outputs; created if missing
    pub output_dir: PathBuf,

    pub inputs: InputFiles,

    pub outputs: OutputFiles,

    /// Number of customer spend rows included in the report
    pub top_customers: usize,

    pub parquet_codec: ParquetCodec,

    /// Rows per parquet row group (default: 32768)
    pub parquet_row_group_size: usize,

    /// Serialize the run report next to the other outputs
    pub write_run_summary: bool,

    /// Directory for the rolling file log; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            inputs: InputFiles::default(),
            outputs: OutputFiles::default(),
            top_customers: 5,
            parquet_codec: ParquetCodec::default(),
            parquet_row_group_size: 32_768,
            write_run_summary: false,
            log_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.parquet_row_group_size == 0 {
            return Err(EtlError::Config(
                "parquet_row_group_size must be greater than zero".to_owned(),
            ));
        }
        if self.outputs.orders_csv == self.outputs.orders_parquet {
            return Err(EtlError::Config(
                "CSV and parquet outputs must use different file names".to_owned(),
            ));
        }
        Ok(())
    }

    /// Row group size, honouring the environment override.
    pub fn effective_row_group_size(&self) -> usize {
        std::env::var(PARQUET_ROW_GROUP_SIZE_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(self.parquet_row_group_size)
    }

    pub fn input_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            PipelineConfig::from_json(r#"{"data_dir": "raw", "top_customers": 10}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("raw"));
        assert_eq!(config.top_customers, 10);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.inputs.orders, "ecommerce_orders.csv");
        assert_eq!(config.parquet_codec, ParquetCodec::Snappy);
    }

    #[test]
    fn test_codec_parses_lowercase() {
        let config = PipelineConfig::from_json(r#"{"parquet_codec": "zstd"}"#).unwrap();
        assert_eq!(config.parquet_codec, ParquetCodec::Zstd);
    }

    #[test]
    fn test_rejects_zero_row_group() {
        let result = PipelineConfig::from_json(r#"{"parquet_row_group_size": 0}"#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let json = PipelineConfig::default().to_json().unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed.outputs.orders_parquet, "orders_clean.parquet");
    }
}
