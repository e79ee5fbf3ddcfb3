//! Type normalization: coerce `order_date` text into a datetime.
//!
//! Coercion is best-effort. A value no accepted format can read becomes
//! absent; the row itself is kept.

use crate::error::Result;
use crate::frame::{clean_orders_to_frame, dtype_summary, orders_to_frame};
use crate::model::{CleanOrder, Order};
use crate::transform::cleaning::NullCounts;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Month grouping key format, e.g. `2024-03`.
pub const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub dtypes_before: Vec<(String, String)>,
    pub dtypes_after: Vec<(String, String)>,
    /// Rows whose date text could not be parsed
    pub unparseable_dates: usize,
    pub nulls_after: NullCounts,
}

/// Parse an order date. Offsets are converted to UTC.
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
}

pub fn month_key(date: &NaiveDateTime) -> String {
    date.format(MONTH_FORMAT).to_string()
}

fn coerce(order: CleanOrder) -> Order {
    let order_date = parse_order_date(&order.order_date);
    Order {
        month: order_date.as_ref().map(month_key),
        order_id: order.order_id,
        customer_id: order.customer_id,
        order_date,
        total_amount: order.total_amount,
        promotion_id: order.promotion_id,
        notes: order.notes,
    }
}

/// Coerce every order date and derive the month key.
///
/// # Errors
///
/// Only fails if the dtype summary frames cannot be built.
pub fn normalize_orders(cleaned: Vec<CleanOrder>) -> Result<(Vec<Order>, NormalizationReport)> {
    let dtypes_before = dtype_summary(&clean_orders_to_frame(&cleaned)?);

    let orders: Vec<Order> = cleaned.into_iter().map(coerce).collect();

    let dtypes_after = dtype_summary(&orders_to_frame(&orders)?);
    let nulls_after = NullCounts::of_orders(&orders);

    if nulls_after.order_date > 0 {
        tracing::warn!(
            rows = nulls_after.order_date,
            "order_date values could not be parsed; rows kept with an absent date"
        );
    }

    Ok((
        orders,
        NormalizationReport {
            dtypes_before,
            dtypes_after,
            unparseable_dates: nulls_after.order_date,
            nulls_after,
        },
    ))
}
