//! Record source: discovers and loads the four raw input tables.
//!
//! Orders and order items are read with every column as text and typed by
//! the pipeline itself, so identifiers such as `007` survive untouched.
//! Customers and products are loaded with normal schema inference; nothing
//! downstream reads their columns.
//!
//! Every table shares one list of null markers, so `NA`, `null` or `N/A`
//! are absent values rather than text. A numeric cell that still cannot be
//! read as a number is also absent; the cell is counted and the row is left
//! for the cleaning stage to judge.

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result, ResultExt as _};
use crate::frame::{has_column, lenient_float_values, require_column, text_values};
use crate::model::{
    CUSTOMER_ID, NOTES, ORDER_DATE, ORDER_ID, OrderItem, PRODUCT_ID, PROMOTION_ID, QUANTITY,
    RawOrder, TOTAL_AMOUNT,
};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Cell contents read as absent in every input table.
pub const NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Row and column counts of one loaded table.
#[derive(Debug, Clone, Serialize)]
pub struct TableShape {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

impl TableShape {
    fn of(name: &str, df: &DataFrame) -> Self {
        Self {
            name: name.to_owned(),
            rows: df.height(),
            columns: df.width(),
        }
    }
}

/// Everything the source stage hands to the transform stage.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub orders: Vec<RawOrder>,
    pub order_items: Vec<OrderItem>,
    pub customers: DataFrame,
    pub products: DataFrame,
}

/// Present cells of a numeric column that could not be read as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnparseableCells {
    pub table: String,
    pub column: String,
    pub count: usize,
}

/// What the source stage observed, for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub csv_files: Vec<String>,
    pub tables: Vec<TableShape>,
    /// Only columns with at least one unparseable cell are listed
    pub unparseable_cells: Vec<UnparseableCells>,
}

/// List the `.csv` file names in `dir`, sorted.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(EtlError::MissingInput(dir.to_path_buf()));
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory: {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Read a CSV file into a frame.
///
/// With `as_text` every column is read as a string; otherwise the schema is
/// inferred from the first 10k rows. Cells matching [`NULL_TOKENS`] are null.
pub fn read_csv(path: &Path, as_text: bool) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }

    let infer_length = if as_text { 0 } else { 10_000 };
    let null_values = NullValues::AllColumns(
        NULL_TOKENS
            .iter()
            .copied()
            .map(PlSmallStr::from_static)
            .collect(),
    );
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(infer_length))
        .with_null_values(Some(null_values))
        .finish()
        .and_then(LazyFrame::collect)
        .with_context(|| format!("Failed to read CSV: {}", path.display()))
}

/// Load all four tables named in the configuration.
pub fn load_sources(config: &PipelineConfig) -> Result<(SourceTables, SourceReport)> {
    let csv_files = discover_csv_files(&config.data_dir)?;
    tracing::info!(
        count = csv_files.len(),
        dir = %config.data_dir.display(),
        "Discovered input files"
    );
    for name in &csv_files {
        tracing::debug!(file = %name, "Input file");
    }

    let orders_df = read_csv(&config.input_path(&config.inputs.orders), true)?;
    let items_df = read_csv(&config.input_path(&config.inputs.order_items), true)?;
    let customers = read_csv(&config.input_path(&config.inputs.customers), false)?;
    let products = read_csv(&config.input_path(&config.inputs.products), false)?;

    let tables = vec![
        TableShape::of("orders", &orders_df),
        TableShape::of("order_items", &items_df),
        TableShape::of("customers", &customers),
        TableShape::of("products", &products),
    ];

    let (orders, mut unparseable_cells) = raw_orders(&orders_df)?;
    let (order_items, item_cells) = order_items(&items_df)?;
    unparseable_cells.extend(item_cells);

    Ok((
        SourceTables {
            orders,
            order_items,
            customers,
            products,
        },
        SourceReport {
            csv_files,
            tables,
            unparseable_cells,
        },
    ))
}

/// Read a numeric column, turning unparseable cells into absent values.
fn numeric_column(
    df: &DataFrame,
    table: &str,
    column: &str,
    unparseable: &mut Vec<UnparseableCells>,
) -> Result<Vec<Option<f64>>> {
    let (values, count) = lenient_float_values(require_column(df, table, column)?)?;
    if count > 0 {
        tracing::warn!(table, column, count, "Non-numeric values treated as absent");
        unparseable.push(UnparseableCells {
            table: table.to_owned(),
            column: column.to_owned(),
            count,
        });
    }
    Ok(values)
}

/// Type the raw orders table.
///
/// The four critical columns must exist. `promotion_id` and `notes` may be
/// missing entirely, in which case every row has them absent. `promotion_id`
/// is never interpreted and stays text.
pub fn raw_orders(df: &DataFrame) -> Result<(Vec<RawOrder>, Vec<UnparseableCells>)> {
    const TABLE: &str = "orders";

    let mut unparseable = Vec::new();
    let ids = text_values(require_column(df, TABLE, ORDER_ID)?)?;
    let customers = text_values(require_column(df, TABLE, CUSTOMER_ID)?)?;
    let dates = text_values(require_column(df, TABLE, ORDER_DATE)?)?;
    let amounts = numeric_column(df, TABLE, TOTAL_AMOUNT, &mut unparseable)?;

    let height = df.height();
    let promotions = if has_column(df, PROMOTION_ID) {
        text_values(require_column(df, TABLE, PROMOTION_ID)?)?
    } else {
        tracing::warn!("orders table has no {PROMOTION_ID} column; treating it as absent");
        vec![None; height]
    };
    let notes = if has_column(df, NOTES) {
        text_values(require_column(df, TABLE, NOTES)?)?
    } else {
        tracing::warn!("orders table has no {NOTES} column; treating it as absent");
        vec![None; height]
    };

    let orders = ids
        .into_iter()
        .zip(customers)
        .zip(dates)
        .zip(amounts)
        .zip(promotions)
        .zip(notes)
        .map(
            |(((((order_id, customer_id), order_date), total_amount), promotion_id), notes)| {
                RawOrder {
                    order_id,
                    customer_id,
                    order_date,
                    total_amount,
                    promotion_id,
                    notes,
                }
            },
        )
        .collect();
    Ok((orders, unparseable))
}

/// Type the order items table. Quantities may be fractional.
pub fn order_items(df: &DataFrame) -> Result<(Vec<OrderItem>, Vec<UnparseableCells>)> {
    const TABLE: &str = "order_items";

    let mut unparseable = Vec::new();
    let orders = text_values(require_column(df, TABLE, ORDER_ID)?)?;
    let products = text_values(require_column(df, TABLE, PRODUCT_ID)?)?;
    let quantities = numeric_column(df, TABLE, QUANTITY, &mut unparseable)?;

    let items = orders
        .into_iter()
        .zip(products)
        .zip(quantities)
        .map(|((order_id, product_id), quantity)| OrderItem {
            order_id,
            product_id,
            quantity,
        })
        .collect();
    Ok((items, unparseable))
}
