//! Run report and its rendering.
//!
//! Stages return plain data. [`log_report`] is the only place that turns it
//! into operator-facing output.

use crate::model::Order;
use crate::sink::{CSV_DATETIME_FORMAT, SinkReport};
use crate::source::SourceReport;
use crate::transform::{Aggregates, CleaningReport, NormalizationReport};
use serde::Serialize;

/// Everything a run observed and produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub source: SourceReport,
    pub cleaning: CleaningReport,
    pub normalization: NormalizationReport,
    /// `None` for clean-only runs
    pub aggregates: Option<Aggregates>,
    pub top_customers: usize,
    /// `None` for dry runs
    pub sink: Option<SinkReport>,
    #[serde(with = "duration_serde", rename = "duration_secs")]
    pub duration: std::time::Duration,
}

mod duration_serde {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

impl RunReport {
    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "Pipeline completed: orders {} → {} ({} dropped, {} duplicates), {} unparseable dates, {} files written, {:.2}s",
            self.cleaning.rows_before,
            self.cleaning.rows_after,
            self.cleaning.dropped_missing_critical,
            self.cleaning.order_id_duplicates,
            self.normalization.unparseable_dates,
            self.sink.as_ref().map_or(0, |s| s.files.len()),
            self.duration.as_secs_f64()
        )
    }
}

/// Emit the full report through `tracing`.
pub fn log_report(report: &RunReport) {
    let source = &report.source;
    tracing::info!("Input files found: {}", source.csv_files.len());
    for name in &source.csv_files {
        tracing::info!("  - {name}");
    }
    for table in &source.tables {
        tracing::info!("{}: {} rows, {} columns", table.name, table.rows, table.columns);
    }
    for cells in &source.unparseable_cells {
        tracing::info!(
            "{}.{}: {} non-numeric values read as absent",
            cells.table,
            cells.column,
            cells.count
        );
    }

    let cleaning = &report.cleaning;
    tracing::info!("Nulls per column in orders (before):");
    for (column, count) in cleaning.nulls_before.pairs() {
        tracing::info!("  {column:<14} {count}");
    }
    tracing::info!("Nulls per column (after cleaning):");
    for (column, count) in cleaning.nulls_after.pairs() {
        tracing::info!("  {column:<14} {count}");
    }
    tracing::info!("Rows before: {}", cleaning.rows_before);
    tracing::info!("Rows after null filter: {}", cleaning.rows_after_null_filter);
    tracing::info!("Exact duplicates: {}", cleaning.exact_duplicates);
    tracing::info!("Duplicates by order_id: {}", cleaning.order_id_duplicates);
    tracing::info!("Rows after: {}", cleaning.rows_after);

    let normalization = &report.normalization;
    tracing::info!("Dtypes before date coercion:");
    for (column, dtype) in &normalization.dtypes_before {
        tracing::info!("  {column:<14} {dtype}");
    }
    tracing::info!("Dtypes after date coercion:");
    for (column, dtype) in &normalization.dtypes_after {
        tracing::info!("  {column:<14} {dtype}");
    }
    tracing::info!("Nulls after type conversion:");
    for (column, count) in normalization.nulls_after.pairs() {
        tracing::info!("  {column:<14} {count}");
    }

    if let Some(aggregates) = &report.aggregates {
        log_aggregates(aggregates, report.top_customers);
    }

    if let Some(sink) = &report.sink {
        for file in &sink.files {
            tracing::info!("Saved {} ({} bytes)", file.path.display(), file.bytes);
        }
        if let Some(sizes) = sink.size_comparison {
            tracing::info!("CSV size: {:.1} KB", sizes.csv_kb);
            tracing::info!("Parquet size: {:.1} KB", sizes.parquet_kb);
            if let Some(ratio) = sizes.ratio() {
                tracing::info!("Parquet is {ratio:.1}x smaller");
            }
        }
    }

    tracing::info!("{}", report.summary());
}

/// Rows shown by [`log_preview`].
pub const PREVIEW_ROWS: usize = 5;

/// Render the first `limit` orders as aligned text lines, header first.
pub fn preview_lines(orders: &[Order], limit: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<10} {:<12} {:<19} {:>12} {:<10} {}",
        "order_id", "customer_id", "order_date", "total_amount", "promotion", "notes"
    )];
    lines.extend(orders.iter().take(limit).map(|order| {
        let date = order
            .order_date
            .map(|d| d.format(CSV_DATETIME_FORMAT).to_string())
            .unwrap_or_default();
        format!(
            "{:<10} {:<12} {:<19} {:>12.2} {:<10} {}",
            order.order_id,
            order.customer_id,
            date,
            order.total_amount,
            order.promotion_id,
            order.notes
        )
    }));
    lines
}

/// Emit the first cleaned orders at debug level.
pub fn log_preview(orders: &[Order]) {
    tracing::debug!("First {PREVIEW_ROWS} cleaned orders:");
    for line in preview_lines(orders, PREVIEW_ROWS) {
        tracing::debug!("  {line}");
    }
}

fn log_aggregates(aggregates: &Aggregates, top: usize) {
    tracing::info!("Top {top} customers by spend:");
    tracing::info!("  {:<16} {:>14} {:>8}", "customer_id", "total_spent", "orders");
    for row in aggregates.customer_spend.iter().take(top) {
        tracing::info!(
            "  {:<16} {:>14.2} {:>8}",
            row.customer_id,
            row.total_spent,
            row.order_count
        );
    }

    match &aggregates.best_selling_product {
        Some(best) => tracing::info!(
            "Best-selling product: ID {} with {} units",
            best.product_id,
            best.quantity
        ),
        None => tracing::warn!("Best-selling product: no order items with a product and quantity"),
    }

    tracing::info!("Monthly revenue:");
    tracing::info!("  {:<8} {:>14}", "month", "total_sales");
    for row in &aggregates.monthly_revenue {
        tracing::info!("  {:<8} {:>14.2}", row.month, row.total_sales);
    }
}
