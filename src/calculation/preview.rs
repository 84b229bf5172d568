//! Before/after preview of a shipping tax fix.

use rust_decimal::Decimal;

use crate::models::{FixPreview, Order, PreviewSide, PreviewTax, TargetRate, TaxCalculation, TaxRateTable};

use super::rate_resolution::resolve_tax_rate_id;

/// Builds the order-level preview for a set of calculations.
///
/// The "after" side starts every rate from its cart tax only and adds the
/// whole proposed shipping VAT to the target rate, creating an entry for it
/// when the order has none yet. When no target identifier resolves, the
/// shipping VAT is left out and `target_rate_id` is `None`.
pub fn preview_shipping_tax_fix(
    order: &Order,
    calculations: &[TaxCalculation],
    rate: TargetRate,
    rates: &TaxRateTable,
) -> FixPreview {
    let mut before = PreviewSide {
        shipping: order.totals.shipping_total,
        ..PreviewSide::default()
    };
    let mut after = PreviewSide {
        shipping: calculations.iter().map(|c| c.new_base).sum(),
        ..PreviewSide::default()
    };

    for line in &order.tax_lines {
        let label = if line.label.is_empty() {
            rates.label_for(line.rate_id).unwrap_or_default().to_string()
        } else {
            line.label.clone()
        };
        before.taxes.insert(
            line.rate_id,
            PreviewTax {
                label: label.clone(),
                total: line.combined_total(),
            },
        );
        after.taxes.insert(
            line.rate_id,
            PreviewTax {
                label,
                total: line.tax_total,
            },
        );
    }

    let target_rate_id = resolve_tax_rate_id(order, rate, rates);
    if let Some(rate_id) = target_rate_id {
        let new_shipping_tax: Decimal = calculations.iter().map(|c| c.new_vat).sum();
        after
            .taxes
            .entry(rate_id)
            .or_insert_with(|| PreviewTax {
                label: rates.label_for(rate_id).unwrap_or(rate.label()).to_string(),
                total: Decimal::ZERO,
            })
            .total += new_shipping_tax;
    }

    FixPreview {
        before,
        after,
        target_rate_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::calculate_shipping_tax_fix;
    use crate::models::{LineItem, TaxLine, TaxRateRecord};
    use chrono::Utc;
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
    fn test_preview_moves_shipping_tax_to_new_rate_entry() {
        let order = Order::new(
            1,
            Utc::now(),
            vec![
                LineItem::product(1, "Bread", dec("100.00"), [(2, dec("15.00"))]),
                LineItem::shipping(2, "Flat rate", dec("86.96"), [(2, dec("13.04"))]),
            ],
        );
        let calcs = calculate_shipping_tax_fix(&order, TargetRate::Standard);

        let preview = preview_shipping_tax_fix(&order, &calcs, TargetRate::Standard, &rates());

        assert_eq!(preview.target_rate_id, Some(1));
        assert_eq!(preview.before.shipping, dec("86.96"));
        assert_eq!(preview.before.taxes[&2].total, dec("28.04"));
        assert_eq!(preview.after.shipping, dec("80.00"));
        assert_eq!(preview.after.taxes[&2].total, dec("15.00"));
        assert_eq!(preview.after.taxes[&1].total, dec("20.00"));
        assert_eq!(preview.after.taxes[&1].label, "MVA 25%");
    }

    #[test]
    fn test_preview_labels_unlabelled_summary_from_table() {
        let mut order = Order::new(
            1,
            Utc::now(),
            vec![
                LineItem::product(1, "Bread", dec("100.00"), [(2, dec("15.00"))]),
                LineItem::shipping(2, "Flat rate", dec("80.00"), [(1, dec("20.00"))]),
            ],
        );
        order.tax_lines.push(TaxLine {
            rate_id: 7,
            label: String::new(),
            tax_total: dec("1.00"),
            shipping_tax_total: Decimal::ZERO,
        });
        let calcs = calculate_shipping_tax_fix(&order, TargetRate::Standard);

        let preview = preview_shipping_tax_fix(&order, &calcs, TargetRate::Standard, &rates());

        assert_eq!(preview.before.taxes[&1].label, "MVA 25%");
        assert_eq!(preview.before.taxes[&2].label, "MVA 15%");
        assert_eq!(preview.after.taxes[&2].label, "MVA 15%");
        assert_eq!(preview.before.taxes[&7].label, "");
    }

    #[test]
    fn test_preview_without_resolvable_rate() {
        let order = Order::new(
            1,
            Utc::now(),
            vec![LineItem::shipping(1, "Flat rate", dec("80.00"), [(1, dec("20.00"))])],
        );
        let calcs = calculate_shipping_tax_fix(&order, TargetRate::Reduced);

        let preview =
            preview_shipping_tax_fix(&order, &calcs, TargetRate::Reduced, &TaxRateTable::default());

        assert_eq!(preview.target_rate_id, None);
        assert_eq!(preview.after.taxes[&1].total, Decimal::ZERO);
    }
}
