//! Aggregation stage: the three fixed business queries.
//!
//! Each query is a pure function over borrowed rows. Ties between equal
//! values are broken by ascending id, where ids that are whole numbers
//! compare numerically and come before any other id.

use crate::model::{BestSellingProduct, CustomerSpend, MonthlyRevenue, Order, OrderItem};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sort key for identifiers read as text.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdKey<'a> {
    Numeric(i128, &'a str),
    Text(&'a str),
}

impl<'a> IdKey<'a> {
    fn of(id: &'a str) -> Self {
        id.trim()
            .parse::<i128>()
            .map_or(Self::Text(id), |n| Self::Numeric(n, id))
    }
}

/// Ascending id order: `"9"` before `"10"`, `"10"` before `"A"`.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    IdKey::of(a).cmp(&IdKey::of(b))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub customer_spend: Vec<CustomerSpend>,
    /// `None` when no order item carries both a product id and a quantity
    pub best_selling_product: Option<BestSellingProduct>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

pub fn compute_aggregates(orders: &[Order], items: &[OrderItem]) -> Aggregates {
    Aggregates {
        customer_spend: customer_spend(orders),
        best_selling_product: best_selling_product(items),
        monthly_revenue: monthly_revenue(orders),
    }
}

/// Q1: spend and order count per customer, highest spend first.
///
/// Equal spend is ordered by ascending `customer_id`.
pub fn customer_spend(orders: &[Order]) -> Vec<CustomerSpend> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for order in orders {
        let entry = groups.entry(order.customer_id.as_str()).or_insert((0.0, 0));
        entry.0 += order.total_amount;
        entry.1 += 1;
    }

    let mut rows: Vec<CustomerSpend> = groups
        .into_iter()
        .map(|(customer_id, (total_spent, order_count))| CustomerSpend {
            customer_id: customer_id.to_owned(),
            total_spent,
            order_count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| compare_ids(&a.customer_id, &b.customer_id))
    });
    rows
}

/// Q2: the product with the largest summed quantity.
///
/// Items without a product id or quantity are skipped. Ties go to the
/// smallest `product_id`. Returns `None` when nothing is left to sum.
pub fn best_selling_product(items: &[OrderItem]) -> Option<BestSellingProduct> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for item in items {
        if let (Some(product_id), Some(quantity)) = (item.product_id.as_deref(), item.quantity) {
            *totals.entry(product_id).or_insert(0.0) += quantity;
        }
    }

    totals
        .into_iter()
        .max_by(|(a_id, a_qty), (b_id, b_qty)| {
            a_qty.total_cmp(b_qty).then_with(|| compare_ids(b_id, a_id))
        })
        .map(|(product_id, quantity)| BestSellingProduct {
            product_id: product_id.to_owned(),
            quantity,
        })
}

/// Q3: revenue per calendar month, oldest month first.
///
/// Orders without a coerced date have no month and are left out.
pub fn monthly_revenue(orders: &[Order]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<&str, f64> = BTreeMap::new();
    for order in orders {
        if let Some(month) = order.month.as_deref() {
            *months.entry(month).or_insert(0.0) += order.total_amount;
        }
    }

    months
        .into_iter()
        .map(|(month, total_sales)| MonthlyRevenue {
            month: month.to_owned(),
            total_sales,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, customer: &str, amount: f64, month: Option<&str>) -> Order {
        Order {
            order_id: id.to_owned(),
            customer_id: customer.to_owned(),
            order_date: None,
            total_amount: amount,
            promotion_id: "0".to_owned(),
            notes: String::new(),
            month: month.map(str::to_owned),
        }
    }

    fn item(product: Option<&str>, quantity: Option<f64>) -> OrderItem {
        OrderItem {
            order_id: Some("1".to_owned()),
            product_id: product.map(str::to_owned),
            quantity,
        }
    }

    #[test]
    fn test_customer_spend_ranking() {
        let orders = vec![
            order("1", "A", 100.0, None),
            order("2", "B", 300.0, None),
            order("3", "A", 150.0, None),
            order("4", "C", 10.0, None),
        ];

        let ranking = customer_spend(&orders);

        let ids: Vec<&str> = ranking.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(ranking.get(1).unwrap().total_spent, 250.0);
        assert_eq!(ranking.get(1).unwrap().order_count, 2);
        assert_eq!(
            ranking.iter().map(|r| r.order_count).sum::<usize>(),
            orders.len()
        );
    }

    #[test]
    fn test_customer_spend_ties_by_id() {
        let orders = vec![
            order("1", "Z", 50.0, None),
            order("2", "M", 50.0, None),
            order("3", "A", 50.0, None),
        ];
        let ids: Vec<String> = customer_spend(&orders)
            .into_iter()
            .map(|r| r.customer_id)
            .collect();
        assert_eq!(ids, vec!["A", "M", "Z"]);

        let numeric = vec![order("1", "10", 50.0, None), order("2", "9", 50.0, None)];
        let ids: Vec<String> = customer_spend(&numeric)
            .into_iter()
            .map(|r| r.customer_id)
            .collect();
        assert_eq!(ids, vec!["9", "10"]);
    }

    #[test]
    fn test_best_selling_product() {
        let items = vec![
            item(Some("P1"), Some(3.0)),
            item(Some("P2"), Some(5.0)),
            item(Some("P1"), Some(4.0)),
            item(None, Some(100.0)),
            item(Some("P3"), None),
        ];
        let best = best_selling_product(&items).unwrap();
        assert_eq!(best.product_id, "P1");
        assert_eq!(best.quantity, 7.0);
    }

    #[test]
    fn test_best_selling_product_keeps_fractions() {
        let items = vec![
            item(Some("P1"), Some(2.5)),
            item(Some("P1"), Some(2.5)),
            item(Some("P2"), Some(4.0)),
        ];
        let best = best_selling_product(&items).unwrap();
        assert_eq!(best.product_id, "P1");
        assert_eq!(best.quantity, 5.0);
    }

    #[test]
    fn test_best_selling_product_tie_goes_to_smallest_id() {
        let items = vec![item(Some("P9"), Some(4.0)), item(Some("P2"), Some(4.0))];
        assert_eq!(best_selling_product(&items).unwrap().product_id, "P2");

        let numeric = vec![item(Some("10"), Some(4.0)), item(Some("9"), Some(4.0))];
        assert_eq!(best_selling_product(&numeric).unwrap().product_id, "9");
    }

    #[test]
    fn test_compare_ids_orders_numbers_numerically() {
        let mut ids = vec!["10", "B", "9", "007", "A", "100"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["007", "9", "10", "100", "A", "B"]);
    }

    #[test]
    fn test_best_selling_product_empty() {
        assert_eq!(best_selling_product(&[]), None);
        assert_eq!(best_selling_product(&[item(None, None)]), None);
    }

    #[test]
    fn test_monthly_revenue_sorted_and_skips_absent() {
        let orders = vec![
            order("1", "A", 10.0, Some("2024-03")),
            order("2", "A", 5.0, Some("2023-12")),
            order("3", "B", 7.5, Some("2024-03")),
            order("4", "B", 99.0, None),
        ];

        let months = monthly_revenue(&orders);

        assert_eq!(
            months,
            vec![
                MonthlyRevenue {
                    month: "2023-12".to_owned(),
                    total_sales: 5.0,
                },
                MonthlyRevenue {
                    month: "2024-03".to_owned(),
                    total_sales: 17.5,
                },
            ]
        );
    }
}
