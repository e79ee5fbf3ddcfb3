//! Cross-stage checks: cleaning, normalization and aggregation together.

use super::*;
use crate::model::{OrderItem, RawOrder};

fn raw(id: &str, customer: Option<&str>, date: &str, amount: f64) -> RawOrder {
    RawOrder {
        order_id: Some(id.to_owned()),
        customer_id: customer.map(str::to_owned),
        order_date: Some(date.to_owned()),
        total_amount: Some(amount),
        promotion_id: None,
        notes: None,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_duplicate_and_bad_date_scenario() {
    let input = vec![
        raw("1", Some("A"), "2024-01-05", 100.0),
        raw("1", Some("A"), "2024-01-05", 150.0),
        raw("2", Some("B"), "bad-date", 50.0),
        raw("3", None, "2024-02-01", 20.0),
    ];

    let (cleaned, cleaning) = clean_orders(input);
    let (orders, normalization) = normalize_orders(cleaned).unwrap();
    let aggregates = compute_aggregates(&orders, &[]);

    assert_eq!(cleaning.dropped_missing_critical, 1);
    assert_eq!(cleaning.order_id_duplicates, 1);
    assert_eq!(orders.len(), 2);

    let first = orders.first().unwrap();
    assert_eq!(first.order_id, "1");
    assert!(close(first.total_amount, 150.0));
    let second = orders.get(1).unwrap();
    assert_eq!(second.order_id, "2");
    assert_eq!(second.order_date, None);
    assert_eq!(normalization.unparseable_dates, 1);

    let spenders: Vec<&str> = aggregates
        .customer_spend
        .iter()
        .map(|r| r.customer_id.as_str())
        .collect();
    assert_eq!(spenders, vec!["A", "B"]);

    assert_eq!(aggregates.monthly_revenue.len(), 1);
    let january = aggregates.monthly_revenue.first().unwrap();
    assert_eq!(january.month, "2024-01");
    assert!(close(january.total_sales, 150.0));

    assert_eq!(aggregates.best_selling_product, None);
}

#[test]
fn test_aggregate_totals_match_cleaned_orders() {
    let mut input = Vec::new();
    for i in 0..40u32 {
        let customer = format!("C{}", i % 7);
        let date = if i % 9 == 0 {
            "not a date".to_owned()
        } else {
            format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1)
        };
        // Every fifth order id repeats the previous one.
        let id = if i % 5 == 4 { i - 1 } else { i };
        input.push(raw(&id.to_string(), Some(customer.as_str()), &date, f64::from(i) * 1.25));
    }

    let (cleaned, _) = clean_orders(input);
    let (orders, _) = normalize_orders(cleaned).unwrap();
    let aggregates = compute_aggregates(&orders, &[]);

    let mut ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), orders.len(), "order ids must be unique");

    let spend = &aggregates.customer_spend;
    assert!(
        spend
            .windows(2)
            .all(|w| matches!(w, [a, b] if a.total_spent >= b.total_spent)),
        "spend ranking must be non-increasing"
    );
    assert_eq!(
        spend.iter().map(|r| r.order_count).sum::<usize>(),
        orders.len()
    );
    let all_amounts: f64 = orders.iter().map(|o| o.total_amount).sum();
    assert!(close(spend.iter().map(|r| r.total_spent).sum(), all_amounts));

    let months = &aggregates.monthly_revenue;
    assert!(
        months
            .windows(2)
            .all(|w| matches!(w, [a, b] if a.month < b.month)),
        "months must be ascending"
    );
    let dated_amounts: f64 = orders
        .iter()
        .filter(|o| o.order_date.is_some())
        .map(|o| o.total_amount)
        .sum();
    assert!(close(months.iter().map(|m| m.total_sales).sum(), dated_amounts));
    assert!(dated_amounts < all_amounts);
}

#[test]
fn test_best_seller_is_true_maximum() {
    let items: Vec<OrderItem> = (0..30u32)
        .map(|i| OrderItem {
            order_id: Some(i.to_string()),
            product_id: Some(format!("P{}", i % 4)),
            quantity: Some(f64::from(i % 6 + 1) * 0.5),
        })
        .collect();

    let best = best_selling_product(&items).unwrap();

    let mut totals = std::collections::HashMap::new();
    for item in &items {
        if let (Some(p), Some(q)) = (&item.product_id, item.quantity) {
            *totals.entry(p.clone()).or_insert(0.0) += q;
        }
    }
    let max = totals.values().copied().fold(f64::MIN, f64::max);
    assert!(close(best.quantity, max));
    assert!(totals.get(&best.product_id).is_some_and(|q| close(*q, best.quantity)));
}
