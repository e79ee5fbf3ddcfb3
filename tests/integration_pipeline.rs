//! Integration tests for the full pipeline
//!
//! These tests copy the fixture tables from `testdata/ecommerce` (or the
//! malformed-cell set in `testdata/messy`) into a temporary data directory,
//! run the pipeline end to end and inspect the files it writes.

use orders_etl::config::PipelineConfig;
use orders_etl::error::EtlError;
use orders_etl::frame::{require_column, text_values};
use orders_etl::pipeline::{RunMode, run_pipeline, verify_run};
use orders_etl::sink::read_parquet;
use orders_etl::source::read_csv;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURES: &str = "testdata/ecommerce";
const MESSY_FIXTURES: &str = "testdata/messy";

struct Workspace {
    _root: TempDir,
    config: PipelineConfig,
}

impl Workspace {
    fn new() -> Self {
        Self::with_fixtures(FIXTURES)
    }

    fn with_fixtures(fixtures: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        for entry in fs::read_dir(fixtures).unwrap() {
            let entry = entry.unwrap();
            fs::copy(entry.path(), data_dir.join(entry.file_name())).unwrap();
        }

        let config = PipelineConfig {
            data_dir,
            output_dir: root.path().join("output"),
            ..Default::default()
        };
        Self {
            _root: root,
            config,
        }
    }

    fn data(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }
}

fn column_text(path: &Path, column: &str) -> Vec<String> {
    let df = read_csv(path, true).unwrap();
    text_values(require_column(&df, "output", column).unwrap())
        .unwrap()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}

fn output_names(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_full_run_on_fixtures() {
    let ws = Workspace::new();
    let report = run_pipeline(&ws.config, RunMode::Full).unwrap();

    assert_eq!(report.source.csv_files.len(), 4);
    assert_eq!(report.cleaning.rows_before, 7);
    assert_eq!(report.cleaning.dropped_missing_critical, 1);
    assert_eq!(report.cleaning.exact_duplicates, 1);
    assert_eq!(report.cleaning.order_id_duplicates, 2);
    assert_eq!(report.cleaning.rows_after, 4);
    assert_eq!(report.normalization.unparseable_dates, 1);

    let aggregates = report.aggregates.as_ref().unwrap();
    let best = aggregates.best_selling_product.as_ref().unwrap();
    assert_eq!(best.product_id, "P1");
    assert_eq!(best.quantity, 6.0);

    assert_eq!(
        output_names(&ws.config.output_dir),
        vec![
            "customer_spend.csv",
            "monthly_revenue.csv",
            "orders_clean.csv",
            "orders_clean.parquet",
        ]
    );

    assert_eq!(
        column_text(&ws.output("customer_spend.csv"), "customer_id"),
        vec!["A", "C", "B"]
    );
    assert_eq!(
        column_text(&ws.output("monthly_revenue.csv"), "month"),
        vec!["2024-01", "2024-02", "2024-03"]
    );
    assert_eq!(
        column_text(&ws.output("orders_clean.csv"), "order_id"),
        vec!["1", "2", "4", "5"]
    );

    let sizes = report.sink.as_ref().unwrap().size_comparison.unwrap();
    assert!(sizes.csv_kb > 0.0);
    assert!(sizes.parquet_kb > 0.0);
}

#[test]
fn test_last_duplicate_wins_in_outputs() {
    let ws = Workspace::new();
    run_pipeline(&ws.config, RunMode::Full).unwrap();

    let amounts = column_text(&ws.output("orders_clean.csv"), "total_amount");
    let first: f64 = amounts.first().unwrap().parse().unwrap();
    assert!((first - 150.0).abs() < 1e-9);

    let notes = column_text(&ws.output("orders_clean.csv"), "notes");
    assert_eq!(notes.first().map(String::as_str), Some("gift wrap"));
}

#[test]
fn test_parquet_matches_csv() {
    let ws = Workspace::new();
    run_pipeline(&ws.config, RunMode::Full).unwrap();

    let parquet = read_parquet(&ws.output("orders_clean.parquet")).unwrap();
    assert_eq!(parquet.height(), 4);

    let verify = verify_run(&ws.config).unwrap();
    assert!(verify.is_consistent(), "{verify:?}");
}

#[test]
fn test_missing_input_file_writes_nothing() {
    let ws = Workspace::new();
    fs::remove_file(ws.data("ecommerce_products.csv")).unwrap();

    let err = run_pipeline(&ws.config, RunMode::Full).unwrap_err();
    assert!(
        matches!(&err, EtlError::MissingInput(path) if path.ends_with("ecommerce_products.csv")),
        "{err}"
    );
    assert!(output_names(&ws.config.output_dir).is_empty());
}

#[test]
fn test_missing_column_writes_nothing() {
    let ws = Workspace::new();
    fs::write(
        ws.data("ecommerce_orders.csv"),
        "order_id,customer_id,order_date\n1,A,2024-01-05\n",
    )
    .unwrap();

    let err = run_pipeline(&ws.config, RunMode::Full).unwrap_err();
    assert!(
        matches!(&err, EtlError::MissingColumn { column, .. } if column == "total_amount"),
        "{err}"
    );
    assert!(output_names(&ws.config.output_dir).is_empty());
}

#[test]
fn test_empty_order_items_has_no_best_seller() {
    let ws = Workspace::new();
    fs::write(
        ws.data("ecommerce_order_items.csv"),
        "order_id,product_id,quantity\n",
    )
    .unwrap();

    let report = run_pipeline(&ws.config, RunMode::Full).unwrap();
    let aggregates = report.aggregates.as_ref().unwrap();
    assert!(aggregates.best_selling_product.is_none());
    assert_eq!(aggregates.customer_spend.len(), 3);
}

#[test]
fn test_clean_only_and_dry_run() {
    let ws = Workspace::new();

    let dry = run_pipeline(&ws.config, RunMode::DryRun).unwrap();
    assert!(dry.sink.is_none());
    assert!(dry.aggregates.is_some());
    assert!(output_names(&ws.config.output_dir).is_empty());

    let clean = run_pipeline(&ws.config, RunMode::CleanOnly).unwrap();
    assert!(clean.aggregates.is_none());
    assert_eq!(
        output_names(&ws.config.output_dir),
        vec!["orders_clean.csv", "orders_clean.parquet"]
    );
}

#[test]
fn test_run_summary_json() {
    let mut ws = Workspace::new();
    ws.config.write_run_summary = true;

    run_pipeline(&ws.config, RunMode::Full).unwrap();

    let content = fs::read_to_string(ws.output("run_summary.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["mode"], "Full");
    assert_eq!(json["cleaning"]["rows_after"], 4);
    assert_eq!(
        json["aggregates"]["best_selling_product"]["product_id"],
        "P1"
    );
}

#[test]
fn test_rerun_replaces_outputs() {
    let ws = Workspace::new();
    run_pipeline(&ws.config, RunMode::Full).unwrap();

    fs::write(
        ws.data("ecommerce_orders.csv"),
        "order_id,customer_id,order_date,total_amount,promotion_id,notes\n9,Z,2024-05-01,10,,\n",
    )
    .unwrap();
    run_pipeline(&ws.config, RunMode::Full).unwrap();

    assert_eq!(
        column_text(&ws.output("orders_clean.csv"), "order_id"),
        vec!["9"]
    );
    assert_eq!(
        column_text(&ws.output("monthly_revenue.csv"), "month"),
        vec!["2024-05"]
    );
}

#[test]
fn test_messy_cells_are_row_level_outcomes() {
    let ws = Workspace::with_fixtures(MESSY_FIXTURES);
    let report = run_pipeline(&ws.config, RunMode::Full).unwrap();

    // NA and null customers, an N/A amount and a non-numeric amount.
    assert_eq!(report.cleaning.rows_before, 6);
    assert_eq!(report.cleaning.nulls_before.customer_id, 2);
    assert_eq!(report.cleaning.nulls_before.total_amount, 2);
    assert_eq!(report.cleaning.dropped_missing_critical, 4);
    assert_eq!(report.cleaning.rows_after, 2);

    let cells: Vec<(&str, &str, usize)> = report
        .source
        .unparseable_cells
        .iter()
        .map(|c| (c.table.as_str(), c.column.as_str(), c.count))
        .collect();
    assert_eq!(
        cells,
        vec![("orders", "total_amount", 1), ("order_items", "quantity", 1)]
    );

    let aggregates = report.aggregates.as_ref().unwrap();
    let spenders: Vec<&str> = aggregates
        .customer_spend
        .iter()
        .map(|r| r.customer_id.as_str())
        .collect();
    assert_eq!(spenders, vec!["A", "C"]);

    let best = aggregates.best_selling_product.as_ref().unwrap();
    assert_eq!(best.product_id, "P1");
    assert_eq!(best.quantity, 5.0);

    assert_eq!(
        column_text(&ws.output("orders_clean.csv"), "promotion_id"),
        vec!["PROMO10", "0"]
    );
    assert_eq!(
        column_text(&ws.output("orders_clean.csv"), "notes"),
        vec!["", ""]
    );
}
