//! Cleaning stage: null handling and duplicate resolution for orders.
//!
//! The rules run in a fixed order, each on the previous step's output:
//!
//! 1. drop rows missing a critical field (`order_id`, `customer_id`,
//!    `order_date`, `total_amount`)
//! 2. fill absent `promotion_id` with `"0"` and absent `notes` with `""`
//! 3. keep only the last row for each `order_id`

use crate::model::{CleanOrder, ORDER_COLUMNS, Order, RawOrder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Absent-value counts for the six order columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NullCounts {
    pub order_id: usize,
    pub customer_id: usize,
    pub order_date: usize,
    pub total_amount: usize,
    pub promotion_id: usize,
    pub notes: usize,
}

impl NullCounts {
    fn from_flags(flags: impl Iterator<Item = [bool; 6]>) -> Self {
        let mut counts = [0usize; 6];
        for row in flags {
            for (count, absent) in counts.iter_mut().zip(row) {
                *count += usize::from(absent);
            }
        }
        let [order_id, customer_id, order_date, total_amount, promotion_id, notes] = counts;
        Self {
            order_id,
            customer_id,
            order_date,
            total_amount,
            promotion_id,
            notes,
        }
    }

    pub fn of_raw(rows: &[RawOrder]) -> Self {
        Self::from_flags(rows.iter().map(RawOrder::absent_flags))
    }

    pub fn of_orders(rows: &[Order]) -> Self {
        Self::from_flags(rows.iter().map(Order::absent_flags))
    }

    /// Column name and count pairs in file column order.
    pub fn pairs(&self) -> [(&'static str, usize); 6] {
        let [a, b, c, d, e, f] = ORDER_COLUMNS;
        [
            (a, self.order_id),
            (b, self.customer_id),
            (c, self.order_date),
            (d, self.total_amount),
            (e, self.promotion_id),
            (f, self.notes),
        ]
    }

    pub fn total(&self) -> usize {
        self.pairs().iter().map(|(_, n)| n).sum()
    }
}

/// What the cleaning stage did, for operator visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after_null_filter: usize,
    pub rows_after: usize,
    pub dropped_missing_critical: usize,
    pub exact_duplicates: usize,
    pub order_id_duplicates: usize,
    pub nulls_before: NullCounts,
    /// Always zero for every column; kept so the report shows it.
    pub nulls_after: NullCounts,
}

/// A row with all critical fields present, optional fields untouched.
struct Survivor {
    order_id: String,
    customer_id: String,
    order_date: String,
    total_amount: f64,
    promotion_id: Option<String>,
    notes: Option<String>,
}

/// Run all three cleaning rules.
pub fn clean_orders(raw: Vec<RawOrder>) -> (Vec<CleanOrder>, CleaningReport) {
    let rows_before = raw.len();
    let nulls_before = NullCounts::of_raw(&raw);

    let survivors = filter_critical(raw);
    let rows_after_null_filter = survivors.len();

    let imputed = impute_optional(survivors);
    let exact_duplicates = count_exact_duplicates(&imputed);
    let order_id_duplicates = count_order_id_duplicates(&imputed);

    let cleaned = keep_last_per_order_id(imputed);

    let report = CleaningReport {
        rows_before,
        rows_after_null_filter,
        rows_after: cleaned.len(),
        dropped_missing_critical: rows_before - rows_after_null_filter,
        exact_duplicates,
        order_id_duplicates,
        nulls_before,
        nulls_after: NullCounts::default(),
    };

    tracing::debug!(?report, "Cleaning finished");
    (cleaned, report)
}

fn filter_critical(raw: Vec<RawOrder>) -> Vec<Survivor> {
    raw.into_iter()
        .filter_map(|row| {
            let RawOrder {
                order_id: Some(order_id),
                customer_id: Some(customer_id),
                order_date: Some(order_date),
                total_amount: Some(total_amount),
                promotion_id,
                notes,
            } = row
            else {
                return None;
            };
            Some(Survivor {
                order_id,
                customer_id,
                order_date,
                total_amount,
                promotion_id,
                notes,
            })
        })
        .collect()
}

fn impute_optional(rows: Vec<Survivor>) -> Vec<CleanOrder> {
    rows.into_iter()
        .map(|row| CleanOrder {
            order_id: row.order_id,
            customer_id: row.customer_id,
            order_date: row.order_date,
            total_amount: row.total_amount,
            promotion_id: row.promotion_id.unwrap_or_else(|| "0".to_owned()),
            notes: row.notes.unwrap_or_default(),
        })
        .collect()
}

/// Rows identical to an earlier row in every field.
pub fn count_exact_duplicates(rows: &[CleanOrder]) -> usize {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.iter()
        .filter(|row| {
            !seen.insert((
                row.order_id.as_str(),
                row.customer_id.as_str(),
                row.order_date.as_str(),
                row.total_amount.to_bits(),
                row.promotion_id.as_str(),
                row.notes.as_str(),
            ))
        })
        .count()
}

/// Rows whose `order_id` already appeared earlier.
pub fn count_order_id_duplicates(rows: &[CleanOrder]) -> usize {
    let unique: HashSet<&str> = rows.iter().map(|row| row.order_id.as_str()).collect();
    rows.len() - unique.len()
}

/// Keep the last occurrence of each `order_id`; survivors keep their
/// relative order.
pub fn keep_last_per_order_id(rows: Vec<CleanOrder>) -> Vec<CleanOrder> {
    let keep: Vec<bool> = {
        let mut last_index: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            last_index.insert(row.order_id.as_str(), idx);
        }
        rows.iter()
            .enumerate()
            .map(|(idx, row)| last_index.get(row.order_id.as_str()) == Some(&idx))
            .collect()
    };

    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}
