//! Effective shipping tax rate of an order.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::models::{EffectiveRate, LineItem, Order};

/// Derives the whole-percentage rate an order's shipping is taxed at.
///
/// Orders without shipping lines yield [`EffectiveRate::NoShipping`]. When the
/// summed shipping base is not positive (free shipping) the rate is 0. Amounts
/// too large to divide also yield 0 and are logged.
///
/// # Examples
///
/// ```
/// use shipping_tax_fix::calculation::get_effective_rate;
/// use shipping_tax_fix::models::{EffectiveRate, LineItem, Order};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
///
/// let order = Order::new(
///     1,
///     Utc::now(),
///     vec![LineItem::shipping(1, "Flat rate", Decimal::new(8000, 2), [(1, Decimal::new(2000, 2))])],
/// );
/// assert_eq!(get_effective_rate(&order), EffectiveRate::Percent(25));
/// ```
pub fn get_effective_rate(order: &Order) -> EffectiveRate {
    if !order.has_shipping() {
        return EffectiveRate::NoShipping;
    }

    let total_base = checked_sum(order.shipping_items().map(|i| Some(i.total)));
    let total_tax = checked_sum(order.shipping_items().map(LineItem::checked_total_tax));

    match (total_base, total_tax) {
        (Some(base), _) if base <= Decimal::ZERO => EffectiveRate::Percent(0),
        (Some(base), Some(tax)) => match percent_of(tax, base) {
            Some(percent) => EffectiveRate::Percent(percent),
            None => overflowed(order),
        },
        _ => overflowed(order),
    }
}

fn checked_sum(mut amounts: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    amounts.try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount?))
}

fn percent_of(tax: Decimal, base: Decimal) -> Option<i64> {
    tax.checked_div(base)?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn overflowed(order: &Order) -> EffectiveRate {
    warn!(
        order_id = order.id,
        "Shipping amounts overflow the effective rate, recording 0%"
    );
    EffectiveRate::Percent(0)
}
