//! Applying a shipping tax fix to an order.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::models::{Order, TargetRate, TaxCalculation, TaxRateTable};

use super::decomposition::calculate_shipping_tax_fix;
use super::rate_resolution::resolve_tax_rate_id;
use super::tax_summary::rebuild_tax_summary;

/// What applying a fix did to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixApplication {
    /// Shipping lines were rewritten; carries the applied calculations.
    Applied(Vec<TaxCalculation>),
    /// Every shipping line already matches the target rate.
    NoChangesNeeded,
    /// The order has no shipping line with a positive total.
    NoShippingItems,
}

/// Reallocates shipping VAT on an order to `rate`, keeping its grand total.
///
/// Each shipping line that needs an update gets the new base and a single tax
/// entry for the target rate. The tax summary and cached tax totals are then
/// rebuilt from the lines, and the grand total captured beforehand is written
/// back.
///
/// The target rate identifier is resolved before anything is changed, so a
/// [`EngineError::RateResolutionFailed`] leaves the order exactly as it was.
///
/// # Examples
///
/// ```
/// use shipping_tax_fix::calculation::{apply_shipping_tax_fix, FixApplication};
/// use shipping_tax_fix::models::{LineItem, Order, TargetRate, TaxRateRecord, TaxRateTable};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
///
/// let rates = TaxRateTable::new(vec![TaxRateRecord {
///     id: 1,
///     rate: Decimal::new(25, 0),
///     label: "MVA 25%".to_string(),
/// }]);
/// let mut order = Order::new(
///     1,
///     Utc::now(),
///     vec![LineItem::shipping(1, "Flat rate", Decimal::new(8696, 2), [(2, Decimal::new(1304, 2))])],
/// );
///
/// let result = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates).unwrap();
/// assert!(matches!(result, FixApplication::Applied(_)));
/// assert_eq!(order.items[0].total, Decimal::new(8000, 2));
/// assert_eq!(order.totals.total, Decimal::new(10000, 2));
/// ```
pub fn apply_shipping_tax_fix(
    order: &mut Order,
    rate: TargetRate,
    rates: &TaxRateTable,
) -> EngineResult<FixApplication> {
    let calculations = calculate_shipping_tax_fix(order, rate);
    if calculations.is_empty() {
        return Ok(FixApplication::NoShippingItems);
    }

    let pending: Vec<TaxCalculation> = calculations
        .into_iter()
        .filter(|c| c.needs_update)
        .collect();
    if pending.is_empty() {
        return Ok(FixApplication::NoChangesNeeded);
    }

    let rate_id = resolve_tax_rate_id(order, rate, rates).ok_or(
        EngineError::RateResolutionFailed {
            rate: rate.percent(),
        },
    )?;

    let original_total = order.totals.total;

    for calc in &pending {
        if let Some(item) = order.item_mut(calc.item_id) {
            item.total = calc.new_base;
            item.taxes = BTreeMap::from([(rate_id, calc.new_vat)]);
        }
    }

    rebuild_tax_summary(order, rates);
    order.totals.total = original_total;

    Ok(FixApplication::Applied(pending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::CENT_TOLERANCE;
    use crate::models::{LineItem, TaxRateRecord};
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

    fn mixed_order() -> Order {
        Order::new(
            1001,
            Utc::now(),
            vec![
                LineItem::product(1, "Coffee", dec("200.00"), [(1, dec("50.00"))]),
                LineItem::shipping(2, "Flat rate", dec("86.96"), [(2, dec("13.04"))]),
                LineItem::shipping(3, "Express", dec("43.48"), [(2, dec("6.52"))]),
            ],
        )
    }

    #[test]
    fn test_apply_rewrites_shipping_lines() {
        let mut order = mixed_order();

        let result = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        match result {
            FixApplication::Applied(changes) => assert_eq!(changes.len(), 2),
            other => panic!("Expected Applied, got {:?}", other),
        }
        let flat = &order.items[1];
        assert_eq!(flat.total, dec("80.00"));
        assert_eq!(flat.taxes, BTreeMap::from([(1, dec("20.00"))]));
        let express = &order.items[2];
        assert_eq!(express.total, dec("40.00"));
        assert_eq!(express.taxes, BTreeMap::from([(1, dec("10.00"))]));
    }

    #[test]
    fn test_apply_preserves_grand_total() {
        let mut order = mixed_order();
        let before = order.totals.total;

        apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        assert!((order.totals.total - before).abs() < CENT_TOLERANCE);
        assert_eq!(order.totals.total, dec("400.00"));
    }

    #[test]
    fn test_apply_rebuilds_summary() {
        let mut order = mixed_order();

        apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        assert_eq!(order.tax_lines.len(), 1);
        let line = order.tax_line(1).unwrap();
        assert_eq!(line.tax_total, dec("50.00"));
        assert_eq!(line.shipping_tax_total, dec("30.00"));
        assert_eq!(order.totals.shipping_total, dec("120.00"));
        assert_eq!(order.totals.shipping_tax, dec("30.00"));
        assert_eq!(order.totals.cart_tax, dec("50.00"));
    }

    #[test]
    fn test_second_apply_needs_no_changes() {
        let mut order = mixed_order();
        apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        let second = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        assert_eq!(second, FixApplication::NoChangesNeeded);
    }

    #[test]
    fn test_order_without_shipping() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![LineItem::product(1, "Coffee", dec("100"), [(1, dec("25"))])],
        );

        let result = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        assert_eq!(result, FixApplication::NoShippingItems);
    }

    #[test]
    fn test_unresolved_rate_leaves_order_untouched() {
        let table = TaxRateTable::new(vec![TaxRateRecord {
            id: 2,
            rate: dec("15"),
            label: "MVA 15%".to_string(),
        }]);
        let mut order = mixed_order();
        let snapshot = order.clone();

        let result = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &table);

        match result {
            Err(EngineError::RateResolutionFailed { rate }) => assert_eq!(rate, 25),
            other => panic!("Expected RateResolutionFailed, got {:?}", other),
        }
        assert_eq!(order, snapshot);
    }

    #[test]
    fn test_lines_already_correct_are_left_alone() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![
                LineItem::shipping(1, "Flat rate", dec("80.00"), [(1, dec("20.00"))]),
                LineItem::shipping(2, "Express", dec("43.48"), [(2, dec("6.52"))]),
            ],
        );

        let result = apply_shipping_tax_fix(&mut order, TargetRate::Standard, &rates()).unwrap();

        match result {
            FixApplication::Applied(changes) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].item_id, 2);
            }
            other => panic!("Expected Applied, got {:?}", other),
        }
        assert_eq!(order.items[0].total, dec("80.00"));
    }
}
