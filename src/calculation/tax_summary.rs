//! Order tax summary reconstruction.
//!
//! After shipping lines are rewritten, the order's per-rate summary and its
//! cached shipping and tax totals no longer agree with the lines. This module
//! rebuilds them from the lines themselves.

use crate::models::{LineItem, Order, TaxBreakdown, TaxRateTable};

/// Rebuilds the tax summary and cached tax totals of an order from its lines.
///
/// Every rate already present in the summary is kept in the breakdown so that
/// rates whose tax moved elsewhere are dropped rather than left stale; rates
/// that end up with no tax are removed. Labels come from the rate table, or
/// from the previous summary line when the table does not know the rate.
///
/// The grand total is left untouched.
pub fn rebuild_tax_summary(order: &mut Order, rates: &TaxRateTable) -> TaxBreakdown {
    let mut breakdown = TaxBreakdown::default();
    for line in &order.tax_lines {
        breakdown.seed(line.rate_id);
    }
    breakdown.accumulate(&order.items);

    order.totals.shipping_total = order.shipping_items().map(|i| i.total).sum();
    order.totals.shipping_tax = order.shipping_items().map(LineItem::total_tax).sum();
    order.totals.cart_tax = breakdown.cart_tax();

    let previous = std::mem::take(&mut order.tax_lines);
    order.tax_lines = breakdown.clone().into_tax_lines(|rate_id| {
        rates
            .label_for(rate_id)
            .map(str::to_string)
            .or_else(|| {
                previous
                    .iter()
                    .find(|line| line.rate_id == rate_id)
                    .map(|line| line.label.clone())
            })
            .unwrap_or_default()
    });

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaxLine, TaxRateRecord};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rates() -> TaxRateTable {
        TaxRateTable::new(vec![
            TaxRateRecord {
                id: 1,
                rate: dec("25"),
                label: "MVA 25%".to_string(),
            },
            TaxRateRecord {
                id: 2,
                rate: dec("15"),
                label: "MVA 15%".to_string(),
            },
        ])
    }

    #[test]
    fn test_moved_shipping_tax_drops_empty_rate() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![LineItem::shipping(1, "Flat rate", dec("86.96"), [(2, dec("13.04"))])],
        );

        let item = order.item_mut(1).unwrap();
        item.total = dec("80.00");
        item.taxes = [(1, dec("20.00"))].into_iter().collect();

        rebuild_tax_summary(&mut order, &rates());

        assert_eq!(order.tax_lines.len(), 1);
        assert_eq!(order.tax_lines[0].rate_id, 1);
        assert_eq!(order.tax_lines[0].label, "MVA 25%");
        assert_eq!(order.tax_lines[0].shipping_tax_total, dec("20.00"));
        assert_eq!(order.totals.shipping_total, dec("80.00"));
        assert_eq!(order.totals.shipping_tax, dec("20.00"));
    }

    #[test]
    fn test_cart_tax_kept_separate_from_shipping_tax() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![
                LineItem::product(1, "Coffee", dec("200.00"), [(1, dec("50.00"))]),
                LineItem::fee(2, "Handling", dec("8.00"), [(1, dec("2.00"))]),
                LineItem::shipping(3, "Flat rate", dec("80.00"), [(1, dec("20.00"))]),
            ],
        );

        let breakdown = rebuild_tax_summary(&mut order, &rates());

        let totals = breakdown.get(1).unwrap();
        assert_eq!(totals.cart_tax, dec("52.00"));
        assert_eq!(totals.shipping_tax, dec("20.00"));
        assert_eq!(order.totals.cart_tax, dec("52.00"));
        assert_eq!(order.tax_lines[0].tax_total, dec("52.00"));
    }

    #[test]
    fn test_unknown_rate_keeps_previous_label() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![LineItem::product(1, "Import", dec("100.00"), [(9, dec("12.00"))])],
        );
        order.tax_lines = vec![TaxLine {
            rate_id: 9,
            label: "Legacy 12%".to_string(),
            tax_total: dec("12.00"),
            shipping_tax_total: Decimal::ZERO,
        }];

        rebuild_tax_summary(&mut order, &rates());

        assert_eq!(order.tax_lines[0].label, "Legacy 12%");
    }

    #[test]
    fn test_rebuild_does_not_touch_grand_total() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![LineItem::shipping(1, "Flat rate", dec("80.00"), [(1, dec("20.00"))])],
        );
        order.totals.total = dec("123.45");

        rebuild_tax_summary(&mut order, &rates());

        assert_eq!(order.totals.total, dec("123.45"));
    }
}
