//! Conversions between polars frames and the typed records in [`crate::model`].
//!
//! Polars stays at the edges of the pipeline: reading CSV inputs, writing
//! CSV and parquet outputs, and describing column dtypes. Everything in
//! between works on typed records.

use crate::error::{EtlError, Result, ResultExt as _};
use crate::model::{
    CUSTOMER_ID, CleanOrder, CustomerSpend, MONTH, MonthlyRevenue, NOTES, ORDER_DATE, ORDER_ID,
    Order, PROMOTION_ID, TOTAL_AMOUNT,
};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

/// Dtype used for the coerced order date in every typed output.
pub fn order_date_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Fetch a column, mapping absence to the fatal [`EtlError::MissingColumn`].
pub fn require_column<'a>(df: &'a DataFrame, table: &str, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(Column::as_materialized_series)
        .map_err(|_| EtlError::MissingColumn {
            table: table.to_owned(),
            column: name.to_owned(),
        })
}

/// Read any column as text. Numeric identifiers become their decimal form.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", series.name()))?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

pub fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", series.name()))?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Read a numeric column leniently. Present cells that are not numbers
/// become absent; the second value counts them.
pub fn lenient_float_values(series: &Series) -> Result<(Vec<Option<f64>>, usize)> {
    let cast = series
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be read as numbers", series.name()))?;
    let unparseable = cast.null_count().saturating_sub(series.null_count());
    Ok((cast.f64()?.into_iter().collect(), unparseable))
}

pub fn datetime_values(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    let millis = series
        .cast(&order_date_dtype())
        .and_then(|s| s.cast(&DataType::Int64))
        .with_context(|| format!("Column '{}' is not a datetime column", series.name()))?;
    Ok(millis
        .i64()?
        .into_iter()
        .map(|v| {
            v.and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
        })
        .collect())
}

fn datetime_series(name: &str, values: &[Option<NaiveDateTime>]) -> Result<Series> {
    let millis: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.map(|dt| dt.and_utc().timestamp_millis()))
        .collect();
    Ok(Series::new(name.into(), millis).cast(&order_date_dtype())?)
}

fn frame(series: Vec<Series>) -> Result<DataFrame> {
    Ok(DataFrame::new(series.into_iter().map(Column::from).collect())?)
}

/// Cleaned orders before date coercion; `order_date` is still text.
pub fn clean_orders_to_frame(orders: &[CleanOrder]) -> Result<DataFrame> {
    frame(vec![
        Series::new(
            ORDER_ID.into(),
            orders.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            CUSTOMER_ID.into(),
            orders.iter().map(|o| o.customer_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            ORDER_DATE.into(),
            orders.iter().map(|o| o.order_date.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            TOTAL_AMOUNT.into(),
            orders.iter().map(|o| o.total_amount).collect::<Vec<_>>(),
        ),
        Series::new(
            PROMOTION_ID.into(),
            orders.iter().map(|o| o.promotion_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            NOTES.into(),
            orders.iter().map(|o| o.notes.clone()).collect::<Vec<_>>(),
        ),
    ])
}

/// Cleaned and coerced orders, including the derived month column.
pub fn orders_to_frame(orders: &[Order]) -> Result<DataFrame> {
    let dates: Vec<Option<NaiveDateTime>> = orders.iter().map(|o| o.order_date).collect();
    frame(vec![
        Series::new(
            ORDER_ID.into(),
            orders.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            CUSTOMER_ID.into(),
            orders.iter().map(|o| o.customer_id.clone()).collect::<Vec<_>>(),
        ),
        datetime_series(ORDER_DATE, &dates)?,
        Series::new(
            TOTAL_AMOUNT.into(),
            orders.iter().map(|o| o.total_amount).collect::<Vec<_>>(),
        ),
        Series::new(
            PROMOTION_ID.into(),
            orders.iter().map(|o| o.promotion_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            NOTES.into(),
            orders.iter().map(|o| o.notes.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            MONTH.into(),
            orders.iter().map(|o| o.month.clone()).collect::<Vec<_>>(),
        ),
    ])
}

/// Inverse of [`orders_to_frame`], used when reading outputs back.
pub fn orders_from_frame(df: &DataFrame) -> Result<Vec<Order>> {
    const TABLE: &str = "cleaned orders";

    let ids = text_values(require_column(df, TABLE, ORDER_ID)?)?;
    let customers = text_values(require_column(df, TABLE, CUSTOMER_ID)?)?;
    let dates = datetime_values(require_column(df, TABLE, ORDER_DATE)?)?;
    let amounts = float_values(require_column(df, TABLE, TOTAL_AMOUNT)?)?;
    let promotions = text_values(require_column(df, TABLE, PROMOTION_ID)?)?;
    let notes = text_values(require_column(df, TABLE, NOTES)?)?;
    let months = text_values(require_column(df, TABLE, MONTH)?)?;

    let rows = ids
        .into_iter()
        .zip(customers)
        .zip(dates)
        .zip(amounts)
        .zip(promotions)
        .zip(notes)
        .zip(months)
        .enumerate();

    let mut orders = Vec::with_capacity(df.height());
    for (idx, ((((((id, customer), date), amount), promotion), note), month)) in rows {
        let (Some(order_id), Some(customer_id), Some(total_amount), Some(promotion_id)) =
            (id, customer, amount, promotion)
        else {
            return Err(EtlError::DataProcessing(format!(
                "{TABLE} row {idx} has an absent required value"
            )));
        };
        orders.push(Order {
            order_id,
            customer_id,
            order_date: date,
            total_amount,
            promotion_id,
            notes: note.unwrap_or_default(),
            month,
        });
    }
    Ok(orders)
}

pub fn customer_spend_to_frame(rows: &[CustomerSpend]) -> Result<DataFrame> {
    frame(vec![
        Series::new(
            CUSTOMER_ID.into(),
            rows.iter().map(|r| r.customer_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "total_spent".into(),
            rows.iter().map(|r| r.total_spent).collect::<Vec<_>>(),
        ),
        Series::new(
            "order_count".into(),
            rows.iter().map(|r| r.order_count as u64).collect::<Vec<_>>(),
        ),
    ])
}

pub fn monthly_revenue_to_frame(rows: &[MonthlyRevenue]) -> Result<DataFrame> {
    frame(vec![
        Series::new(
            MONTH.into(),
            rows.iter().map(|r| r.month.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "total_sales".into(),
            rows.iter().map(|r| r.total_sales).collect::<Vec<_>>(),
        ),
    ])
}

/// Column name and dtype pairs, in column order.
pub fn dtype_summary(df: &DataFrame) -> Vec<(String, String)> {
    df.get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.dtype().to_string()))
        .collect()
}
