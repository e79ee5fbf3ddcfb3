//! Typed records for every table the pipeline touches.
//!
//! Each table is a plain struct with statically declared fields. Absence is
//! an `Option`, so a read site cannot forget that a value may be missing.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const ORDER_DATE: &str = "order_date";
pub const TOTAL_AMOUNT: &str = "total_amount";
pub const PROMOTION_ID: &str = "promotion_id";
pub const NOTES: &str = "notes";
pub const MONTH: &str = "month";

pub const PRODUCT_ID: &str = "product_id";
pub const QUANTITY: &str = "quantity";

/// Order columns in file order.
pub const ORDER_COLUMNS: [&str; 6] = [
    ORDER_ID,
    CUSTOMER_ID,
    ORDER_DATE,
    TOTAL_AMOUNT,
    PROMOTION_ID,
    NOTES,
];

/// An order row exactly as read from the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub order_date: Option<String>,
    pub total_amount: Option<f64>,
    pub promotion_id: Option<String>,
    pub notes: Option<String>,
}

impl RawOrder {
    /// Absent flags in [`ORDER_COLUMNS`] order.
    pub fn absent_flags(&self) -> [bool; 6] {
        [
            self.order_id.is_none(),
            self.customer_id.is_none(),
            self.order_date.is_none(),
            self.total_amount.is_none(),
            self.promotion_id.is_none(),
            self.notes.is_none(),
        ]
    }
}

/// An order that passed critical-field filtering and imputation.
///
/// The date is still the raw text at this point.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOrder {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: String,
    pub total_amount: f64,
    pub promotion_id: String,
    pub notes: String,
}

/// A cleaned order with its date coerced and its month key derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: Option<NaiveDateTime>,
    pub total_amount: f64,
    pub promotion_id: String,
    pub notes: String,
    pub month: Option<String>,
}

impl Order {
    /// Absent flags in [`ORDER_COLUMNS`] order. Only the date can be absent.
    pub fn absent_flags(&self) -> [bool; 6] {
        [false, false, self.order_date.is_none(), false, false, false]
    }
}

/// An order line item. Consumed as-is by the aggregation stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderItem {
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    pub quantity: Option<f64>,
}

/// One row of the customer spend ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub total_spent: f64,
    pub order_count: usize,
}

/// Revenue for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub total_sales: f64,
}

/// Quantities are summed as `f64`; fractional quantities are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSellingProduct {
    pub product_id: String,
    pub quantity: f64,
}
