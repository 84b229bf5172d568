//! Decomposition of tax-inclusive shipping totals.
//!
//! This module splits a shipping line's inclusive total into a base and a VAT
//! amount under a target rate, and builds the per-line [`TaxCalculation`]
//! records that drive both previews and applies.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Order, TargetRate, TaxCalculation};

/// Amounts within a cent of each other are treated as equal.
pub const CENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds an amount to two decimals, halves away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Splits a tax-inclusive total into `(base, vat)` under `rate`.
///
/// The base is derived by division and the VAT by subtraction, so the two
/// always add back up to the rounded total.
///
/// # Examples
///
/// ```
/// use shipping_tax_fix::calculation::decompose_inclusive_total;
/// use shipping_tax_fix::models::TargetRate;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let (base, vat) = decompose_inclusive_total(
///     Decimal::from_str("100.00").unwrap(),
///     TargetRate::Standard,
/// );
/// assert_eq!(base, Decimal::from_str("80.00").unwrap());
/// assert_eq!(vat, Decimal::from_str("20.00").unwrap());
/// ```
pub fn decompose_inclusive_total(total: Decimal, rate: TargetRate) -> (Decimal, Decimal) {
    let base = round_currency(total / (Decimal::ONE + rate.multiplier()));
    let vat = round_currency(total - base);
    (base, vat)
}

/// Computes the proposed reallocation for every shipping line of an order.
///
/// Lines whose inclusive total is zero or negative are skipped, so an order
/// without chargeable shipping yields an empty list. Lines whose amounts
/// overflow when added are skipped too.
pub fn calculate_shipping_tax_fix(order: &Order, rate: TargetRate) -> Vec<TaxCalculation> {
    order
        .shipping_items()
        .filter_map(|item| {
            let current_base = item.total;
            let current_vat = item.checked_total_tax()?;
            let current_total = current_base.checked_add(current_vat)?;

            if current_total <= Decimal::ZERO {
                return None;
            }

            let (new_base, new_vat) = decompose_inclusive_total(current_total, rate);
            let new_total = new_base + new_vat;
            let needs_update =
                drifted(new_base, current_base) || drifted(new_vat, current_vat);

            Some(TaxCalculation {
                item_id: item.id,
                shipping_method: item.name.clone(),
                current_base,
                current_vat,
                current_total,
                new_base,
                new_vat,
                new_total,
                needs_update,
                totals_match: (new_total - current_total).abs() < CENT_TOLERANCE,
            })
        })
        .collect()
}

fn drifted(proposed: Decimal, current: Decimal) -> bool {
    proposed
        .checked_sub(current)
        .is_none_or(|diff| diff.abs() > CENT_TOLERANCE)
}
