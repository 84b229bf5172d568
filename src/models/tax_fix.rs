//! Result models for shipping tax fixes.
//!
//! This module contains the per-line [`TaxCalculation`], the before/after
//! [`FixPreview`] and the [`ApplyOutcome`] that callers render as a notice.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxRateId;

/// The proposed reallocation for one shipping line.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::models::TaxCalculation;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let calc = TaxCalculation {
///     item_id: 3,
///     shipping_method: "Flat rate".to_string(),
///     current_base: Decimal::from_str("86.96").unwrap(),
///     current_vat: Decimal::from_str("13.04").unwrap(),
///     current_total: Decimal::from_str("100.00").unwrap(),
///     new_base: Decimal::from_str("80.00").unwrap(),
///     new_vat: Decimal::from_str("20.00").unwrap(),
///     new_total: Decimal::from_str("100.00").unwrap(),
///     needs_update: true,
///     totals_match: true,
/// };
/// assert!(calc.needs_update);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculation {
    /// The shipping line this calculation belongs to.
    pub item_id: u64,
    /// Shipping method title.
    pub shipping_method: String,
    /// Base amount before the fix.
    pub current_base: Decimal,
    /// VAT amount before the fix.
    pub current_vat: Decimal,
    /// Tax-inclusive total before the fix.
    pub current_total: Decimal,
    /// Proposed base amount.
    pub new_base: Decimal,
    /// Proposed VAT amount.
    pub new_vat: Decimal,
    /// Proposed base plus VAT.
    pub new_total: Decimal,
    /// Whether base or VAT moves by more than a cent.
    pub needs_update: bool,
    /// Whether the proposed split reproduces the inclusive total.
    pub totals_match: bool,
}

/// Tax collected for one rate in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTax {
    /// Display label of the rate.
    pub label: String,
    /// Total tax for the rate.
    pub total: Decimal,
}

/// Shipping total and per-rate taxes on one side of a preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSide {
    /// Shipping total (tax exclusive).
    pub shipping: Decimal,
    /// Tax totals keyed by rate id.
    pub taxes: BTreeMap<TaxRateId, PreviewTax>,
}

/// Order-level view of what applying a fix would change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixPreview {
    /// Current state.
    pub before: PreviewSide,
    /// State after the fix.
    pub after: PreviewSide,
    /// The rate id shipping tax would be moved to, if one resolves.
    pub target_rate_id: Option<TaxRateId>,
}

/// Why an apply finished the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    /// Shipping lines were updated.
    Applied,
    /// Every shipping line already matches the target rate.
    NoChangesNeeded,
    /// The order has no shipping line with a positive total.
    NoShippingItems,
    /// The requested rate is not supported.
    UnsupportedRate,
    /// No tax rate identifier matches the target rate.
    RateUnresolved,
    /// The order does not exist.
    OrderNotFound,
    /// The order could not be read or written.
    StorageFailed,
}

/// The structured result of an apply, ready to show to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Whether the order was changed.
    pub success: bool,
    /// Machine-readable reason.
    pub status: FixStatus,
    /// Human-readable message.
    pub message: String,
    /// The calculations that were applied.
    #[serde(default)]
    pub changes: Vec<TaxCalculation>,
}

impl ApplyOutcome {
    /// Creates a successful outcome.
    pub fn applied(rate_percent: u32, changes: Vec<TaxCalculation>) -> Self {
        Self {
            success: true,
            status: FixStatus::Applied,
            message: format!("Shipping tax fix applied successfully ({}%)", rate_percent),
            changes,
        }
    }

    /// Creates an unsuccessful outcome.
    pub fn failed(status: FixStatus, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
            changes: Vec::new(),
        }
    }
}
