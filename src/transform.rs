//! Transform stage: cleaning, date normalization and aggregation.
//!
//! ```text
//! Vec<RawOrder> ──clean_orders──> Vec<CleanOrder> ──normalize_orders──> Vec<Order>
//!                                                                          │
//!                        Vec<OrderItem> ──────────────compute_aggregates───┘
//! ```

pub mod aggregate;
pub mod cleaning;
pub mod normalize;

pub use aggregate::{
    Aggregates, best_selling_product, compute_aggregates, customer_spend, monthly_revenue,
};
pub use cleaning::{CleaningReport, NullCounts, clean_orders};
pub use normalize::{NormalizationReport, month_key, normalize_orders, parse_order_date};

#[cfg(test)]
mod tests;
