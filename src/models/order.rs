//! Order model and related types.
//!
//! This module defines the [`Order`] aggregate together with its line items,
//! tax summary lines, cached totals and annotations. The shapes mirror what an
//! order-storage layer persists: every line item carries a map of tax rate id
//! to tax amount, and the order keeps one summary line per tax rate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of an order in the store.
pub type OrderId = u64;

/// External identifier of a configured tax rate.
pub type TaxRateId = u64;

/// The kind of a line item on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    /// A product line.
    Product,
    /// A fee line.
    Fee,
    /// A shipping line.
    Shipping,
}

/// A single line item on an order.
///
/// For shipping lines `name` is the shipping method title and `total` is the
/// tax-exclusive base amount. The tax amount is the sum of `taxes`.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::models::LineItem;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let item = LineItem::shipping(
///     7,
///     "Flat rate",
///     Decimal::from_str("86.96").unwrap(),
///     [(1, Decimal::from_str("13.04").unwrap())],
/// );
/// assert_eq!(item.inclusive_total(), Decimal::from_str("100.00").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Identifier of the item within the order.
    pub id: u64,
    /// What kind of line this is.
    pub kind: LineItemKind,
    /// Product name, fee name, or shipping method title.
    pub name: String,
    /// Tax-exclusive total of the line.
    pub total: Decimal,
    /// Tax amounts keyed by tax rate id.
    #[serde(default)]
    pub taxes: BTreeMap<TaxRateId, Decimal>,
}

impl LineItem {
    /// Creates a line item of the given kind.
    pub fn new(
        id: u64,
        kind: LineItemKind,
        name: impl Into<String>,
        total: Decimal,
        taxes: impl IntoIterator<Item = (TaxRateId, Decimal)>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            total,
            taxes: taxes.into_iter().collect(),
        }
    }

    /// Creates a product line item.
    pub fn product(
        id: u64,
        name: impl Into<String>,
        total: Decimal,
        taxes: impl IntoIterator<Item = (TaxRateId, Decimal)>,
    ) -> Self {
        Self::new(id, LineItemKind::Product, name, total, taxes)
    }

    /// Creates a fee line item.
    pub fn fee(
        id: u64,
        name: impl Into<String>,
        total: Decimal,
        taxes: impl IntoIterator<Item = (TaxRateId, Decimal)>,
    ) -> Self {
        Self::new(id, LineItemKind::Fee, name, total, taxes)
    }

    /// Creates a shipping line item.
    pub fn shipping(
        id: u64,
        method_title: impl Into<String>,
        total: Decimal,
        taxes: impl IntoIterator<Item = (TaxRateId, Decimal)>,
    ) -> Self {
        Self::new(id, LineItemKind::Shipping, method_title, total, taxes)
    }

    /// Returns true if this is a shipping line.
    pub fn is_shipping(&self) -> bool {
        self.kind == LineItemKind::Shipping
    }

    /// Returns the sum of all tax amounts on the line.
    pub fn total_tax(&self) -> Decimal {
        self.taxes.values().copied().sum()
    }

    /// Returns the sum of all tax amounts, or `None` if it overflows.
    pub fn checked_total_tax(&self) -> Option<Decimal> {
        self.taxes
            .values()
            .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
    }

    /// Returns the tax-inclusive total (base plus tax).
    pub fn inclusive_total(&self) -> Decimal {
        self.total + self.total_tax()
    }
}

/// One entry of the order tax summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    /// The tax rate this entry aggregates.
    pub rate_id: TaxRateId,
    /// Display label of the rate.
    #[serde(default)]
    pub label: String,
    /// Tax collected on products and fees.
    pub tax_total: Decimal,
    /// Tax collected on shipping.
    pub shipping_tax_total: Decimal,
}

impl TaxLine {
    /// Returns cart tax plus shipping tax.
    pub fn combined_total(&self) -> Decimal {
        self.tax_total + self.shipping_tax_total
    }
}

/// Cart and shipping tax collected for one rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTotals {
    /// Tax from product and fee lines.
    pub cart_tax: Decimal,
    /// Tax from shipping lines.
    pub shipping_tax: Decimal,
}

impl RateTotals {
    /// Returns cart tax plus shipping tax.
    pub fn combined(&self) -> Decimal {
        self.cart_tax + self.shipping_tax
    }
}

/// Per-rate aggregation of the taxes carried by an order's line items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxBreakdown {
    entries: BTreeMap<TaxRateId, RateTotals>,
}

impl TaxBreakdown {
    /// Builds a breakdown from line items alone.
    pub fn from_items(items: &[LineItem]) -> Self {
        let mut breakdown = Self::default();
        breakdown.accumulate(items);
        breakdown
    }

    /// Registers a rate with zero totals so it survives into the result.
    pub fn seed(&mut self, rate_id: TaxRateId) {
        self.entries.entry(rate_id).or_default();
    }

    /// Adds every item's taxes to the cart or shipping subtotal of its rate.
    pub fn accumulate(&mut self, items: &[LineItem]) {
        for item in items {
            for (rate_id, amount) in &item.taxes {
                let totals = self.entries.entry(*rate_id).or_default();
                if item.is_shipping() {
                    totals.shipping_tax += *amount;
                } else {
                    totals.cart_tax += *amount;
                }
            }
        }
    }

    /// Returns the totals for a rate, if the breakdown knows it.
    pub fn get(&self, rate_id: TaxRateId) -> Option<&RateTotals> {
        self.entries.get(&rate_id)
    }

    /// Iterates over all rates in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TaxRateId, &RateTotals)> {
        self.entries.iter()
    }

    /// Sum of cart tax across all rates.
    pub fn cart_tax(&self) -> Decimal {
        self.entries.values().map(|t| t.cart_tax).sum()
    }

    /// Sum of shipping tax across all rates.
    pub fn shipping_tax(&self) -> Decimal {
        self.entries.values().map(|t| t.shipping_tax).sum()
    }

    /// Converts the breakdown into summary lines, dropping rates whose
    /// combined total is not positive.
    pub fn into_tax_lines<F>(self, mut label_for: F) -> Vec<TaxLine>
    where
        F: FnMut(TaxRateId) -> String,
    {
        self.entries
            .into_iter()
            .filter(|(_, totals)| totals.combined() > Decimal::ZERO)
            .map(|(rate_id, totals)| TaxLine {
                rate_id,
                label: label_for(rate_id),
                tax_total: totals.cart_tax,
                shipping_tax_total: totals.shipping_tax,
            })
            .collect()
    }
}

/// Cached order-level totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of shipping line bases.
    pub shipping_total: Decimal,
    /// Sum of shipping line taxes.
    pub shipping_tax: Decimal,
    /// Sum of product and fee line taxes.
    pub cart_tax: Decimal,
    /// The grand total charged to the customer.
    pub total: Decimal,
}

/// Annotations persisted alongside an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMeta {
    /// Effective shipping tax rate, `-1` when the order has no shipping.
    #[serde(default)]
    pub shipping_tax_rate: Option<i64>,
    /// When a shipping tax fix was last applied.
    #[serde(default)]
    pub last_fix_applied: Option<DateTime<Utc>>,
}

/// A free-text note attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNote {
    /// When the note was written.
    pub created_at: DateTime<Utc>,
    /// The note text.
    pub message: String,
}

impl OrderNote {
    /// Creates a note stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            message: message.into(),
        }
    }
}

/// An order with its line items, tax summary and cached totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier of the order.
    pub id: OrderId,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Product, fee and shipping lines.
    pub items: Vec<LineItem>,
    /// The per-rate tax summary.
    #[serde(default)]
    pub tax_lines: Vec<TaxLine>,
    /// Cached totals.
    pub totals: OrderTotals,
    /// Persisted annotations.
    #[serde(default)]
    pub meta: OrderMeta,
    /// Notes attached to the order.
    #[serde(default)]
    pub notes: Vec<OrderNote>,
}

impl Order {
    /// Creates an order whose tax summary and totals are derived from its items.
    ///
    /// Summary labels are left empty. Previews and summary rebuilds take them
    /// from the tax rate table.
    pub fn new(id: OrderId, created_at: DateTime<Utc>, items: Vec<LineItem>) -> Self {
        let mut order = Self {
            id,
            created_at,
            items,
            tax_lines: Vec::new(),
            totals: OrderTotals::default(),
            meta: OrderMeta::default(),
            notes: Vec::new(),
        };
        order.recompute_totals();
        order
    }

    /// Re-derives the tax summary and every cached total from the items.
    ///
    /// Labels of rates already in the summary are kept.
    pub fn recompute_totals(&mut self) {
        let breakdown = TaxBreakdown::from_items(&self.items);
        self.totals = OrderTotals {
            shipping_total: self.shipping_items().map(|i| i.total).sum(),
            shipping_tax: breakdown.shipping_tax(),
            cart_tax: breakdown.cart_tax(),
            total: self.items.iter().map(LineItem::inclusive_total).sum(),
        };

        let previous = std::mem::take(&mut self.tax_lines);
        self.tax_lines = breakdown.into_tax_lines(|rate_id| {
            previous
                .iter()
                .find(|line| line.rate_id == rate_id)
                .map(|line| line.label.clone())
                .unwrap_or_default()
        });
    }

    /// Iterates over the shipping lines.
    pub fn shipping_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|i| i.is_shipping())
    }

    /// Returns true if the order has at least one shipping line.
    pub fn has_shipping(&self) -> bool {
        self.shipping_items().next().is_some()
    }

    /// Looks up a line item by id.
    pub fn item_mut(&mut self, item_id: u64) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Returns the summary line for a rate, if present.
    pub fn tax_line(&self, rate_id: TaxRateId) -> Option<&TaxLine> {
        self.tax_lines.iter().find(|t| t.rate_id == rate_id)
    }
}
