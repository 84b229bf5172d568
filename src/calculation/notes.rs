//! Order note text for previews and applied fixes.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{TargetRate, TaxCalculation};

/// Formats an amount with exactly `precision` decimals.
///
/// # Examples
///
/// ```
/// use shipping_tax_fix::calculation::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(Decimal::new(8, 0), 2), "8.00");
/// assert_eq!(format_amount(Decimal::new(13045, 3), 2), "13.05");
/// ```
pub fn format_amount(amount: Decimal, precision: u32) -> String {
    let rounded = amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", precision as usize, rounded)
}

/// Note recording the before/after amounts of an applied fix.
pub fn applied_fix_note(rate: TargetRate, changes: &[TaxCalculation], precision: u32) -> String {
    let mut note = format!("Shipping tax fix applied ({}):", rate);
    for calc in changes {
        note.push_str(&format!(
            "\n{}: Base {} -> {}, VAT {} -> {}",
            calc.shipping_method,
            format_amount(calc.current_base, precision),
            format_amount(calc.new_base, precision),
            format_amount(calc.current_vat, precision),
            format_amount(calc.new_vat, precision),
        ));
    }
    note
}

/// Single-line note describing a proposed fix, as left by bulk previews.
pub fn preview_note(rate: TargetRate, calc: &TaxCalculation, precision: u32) -> String {
    format!(
        "Bulk Preview ({}): {} - Current: Base {} + VAT {}, Proposed: Base {} + VAT {}",
        rate,
        calc.shipping_method,
        format_amount(calc.current_base, precision),
        format_amount(calc.current_vat, precision),
        format_amount(calc.new_base, precision),
        format_amount(calc.new_vat, precision),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn calc() -> TaxCalculation {
        TaxCalculation {
            item_id: 3,
            shipping_method: "Flat rate".to_string(),
            current_base: dec("86.96"),
            current_vat: dec("13.04"),
            current_total: dec("100.00"),
            new_base: dec("80"),
            new_vat: dec("20"),
            new_total: dec("100"),
            needs_update: true,
            totals_match: true,
        }
    }

    #[test]
    fn test_format_amount_pads_and_rounds() {
        assert_eq!(format_amount(dec("80"), 2), "80.00");
        assert_eq!(format_amount(dec("1.2345"), 3), "1.235");
        assert_eq!(format_amount(dec("19.5"), 0), "20");
    }

    #[test]
    fn test_applied_fix_note() {
        let note = applied_fix_note(TargetRate::Standard, &[calc()], 2);
        assert_eq!(
            note,
            "Shipping tax fix applied (25%):\nFlat rate: Base 86.96 -> 80.00, VAT 13.04 -> 20.00"
        );
    }

    #[test]
    fn test_preview_note() {
        let note = preview_note(TargetRate::Standard, &calc(), 2);
        assert_eq!(
            note,
            "Bulk Preview (25%): Flat rate - Current: Base 86.96 + VAT 13.04, Proposed: Base 80.00 + VAT 20.00"
        );
    }
}
