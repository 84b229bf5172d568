//! Tax rate identifier resolution.
//!
//! Shipping VAT must be tagged with the identifier of a configured tax rate.
//! The identifier is taken from the order itself when one of its lines already
//! uses a matching rate, and from the rate table otherwise.

use rust_decimal::Decimal;

use crate::models::{Order, TargetRate, TaxRateId, TaxRateTable};

/// Configured rates closer than this many points to the target match it.
pub const RATE_MATCH_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 0);

/// Finds the tax rate identifier to tag shipping VAT with.
///
/// Every tax entry on the order's lines is checked against the table; among
/// the rates within [`RATE_MATCH_TOLERANCE`] of the target the closest wins,
/// ties going to the first one seen. When the order carries no suitable rate,
/// the first table entry whose rounded percentage equals the target is used.
///
/// Returns `None` when neither source yields an identifier.
pub fn resolve_tax_rate_id(
    order: &Order,
    rate: TargetRate,
    rates: &TaxRateTable,
) -> Option<TaxRateId> {
    let target = Decimal::from(rate.percent());
    let mut best: Option<(TaxRateId, Decimal)> = None;

    for rate_id in order.items.iter().flat_map(|item| item.taxes.keys()) {
        let Some(configured) = rates.rate_by_id(*rate_id) else {
            continue;
        };

        let distance = (configured - target).abs();
        if distance < RATE_MATCH_TOLERANCE && best.is_none_or(|(_, d)| distance < d) {
            best = Some((*rate_id, distance));
        }
    }

    best.map(|(id, _)| id)
        .or_else(|| rates.find_by_rounded_percent(rate.percent()))
}
