//! The shipping tax fix engine.
//!
//! [`TaxFixEngine`] wraps the calculation functions with the configuration
//! they need (settings and the tax rate table) and turns their results into
//! [`ApplyOutcome`] values that callers can show directly. Nothing here reads
//! ambient state: every operation receives the order or store it works on.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::calculation::{
    FixApplication, applied_fix_note, apply_shipping_tax_fix, calculate_shipping_tax_fix,
    get_effective_rate, preview_shipping_tax_fix,
};
use crate::config::{ConfigLoader, EngineConfig, Settings};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ApplyOutcome, EffectiveRate, FixPreview, FixStatus, Order, OrderId, OrderNote, TargetRate,
    TaxCalculation, TaxRateTable,
};
use crate::store::OrderStore;

/// Recomputes and applies shipping VAT splits for orders.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::config::{EngineConfig, Settings};
/// use shipping_tax_fix::engine::TaxFixEngine;
/// use shipping_tax_fix::models::{LineItem, Order, TaxRateRecord, TaxRateTable};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
///
/// let rates = TaxRateTable::new(vec![TaxRateRecord {
///     id: 1,
///     rate: Decimal::new(25, 0),
///     label: "MVA 25%".to_string(),
/// }]);
/// let engine = TaxFixEngine::new(EngineConfig::new(Settings::default(), rates));
///
/// let mut order = Order::new(
///     1,
///     Utc::now(),
///     vec![LineItem::shipping(1, "Flat rate", Decimal::new(8696, 2), [(1, Decimal::new(1304, 2))])],
/// );
///
/// let outcome = engine.apply(&mut order, 25);
/// assert!(outcome.success);
///
/// let again = engine.apply(&mut order, 25);
/// assert!(!again.success);
/// ```
#[derive(Debug, Clone)]
pub struct TaxFixEngine {
    config: EngineConfig,
}

impl TaxFixEngine {
    /// Creates an engine from its configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine from loaded configuration files.
    pub fn from_loader(loader: &ConfigLoader) -> Self {
        Self::new(loader.config().clone())
    }

    /// Returns the settings the engine runs with.
    pub fn settings(&self) -> &Settings {
        self.config.settings()
    }

    /// Returns the configured tax rates.
    pub fn tax_rates(&self) -> &TaxRateTable {
        self.config.tax_rates()
    }

    fn verbose(&self) -> bool {
        self.settings().general.enable_logging
    }

    fn target_rate(&self, rate_percent: u32) -> Option<TargetRate> {
        match TargetRate::try_from(rate_percent) {
            Ok(rate) => Some(rate),
            Err(err) => {
                warn!(rate = rate_percent, error = %err, "Rejected shipping tax rate");
                None
            }
        }
    }

    /// Computes the proposed split for every chargeable shipping line.
    ///
    /// Returns an empty list for unsupported rates and for orders without
    /// chargeable shipping.
    pub fn calculate(&self, order: &Order, rate_percent: u32) -> Vec<TaxCalculation> {
        match self.target_rate(rate_percent) {
            Some(rate) => calculate_shipping_tax_fix(order, rate),
            None => Vec::new(),
        }
    }

    /// Builds the before/after preview, or `None` when there is nothing to fix.
    pub fn preview(&self, order: &Order, rate_percent: u32) -> Option<FixPreview> {
        let rate = self.target_rate(rate_percent)?;
        let calculations = calculate_shipping_tax_fix(order, rate);
        if calculations.is_empty() {
            return None;
        }
        Some(preview_shipping_tax_fix(
            order,
            &calculations,
            rate,
            self.tax_rates(),
        ))
    }

    /// Applies the fix to an in-memory order.
    ///
    /// On success the order's shipping tax rate annotation and last-fix
    /// timestamp are updated as well. The grand total is never changed.
    pub fn apply(&self, order: &mut Order, rate_percent: u32) -> ApplyOutcome {
        match self.target_rate(rate_percent) {
            Some(rate) => self.apply_rate(order, rate),
            None => Self::unsupported(rate_percent),
        }
    }

    fn unsupported(rate_percent: u32) -> ApplyOutcome {
        ApplyOutcome::failed(
            FixStatus::UnsupportedRate,
            EngineError::UnsupportedRate { rate: rate_percent }.to_string(),
        )
    }

    fn apply_rate(&self, order: &mut Order, rate: TargetRate) -> ApplyOutcome {
        let original_total = order.totals.total;
        if self.verbose() {
            info!(order_id = order.id, %original_total, %rate, "Applying shipping tax fix");
        }

        match apply_shipping_tax_fix(order, rate, self.tax_rates()) {
            Ok(FixApplication::Applied(changes)) => {
                order.meta.shipping_tax_rate = Some(get_effective_rate(order).meta_value());
                order.meta.last_fix_applied = Some(Utc::now());
                if self.verbose() {
                    info!(
                        order_id = order.id,
                        changed_items = changes.len(),
                        total = %order.totals.total,
                        "Shipping tax fix applied, total preserved"
                    );
                }
                ApplyOutcome::applied(rate.percent(), changes)
            }
            Ok(FixApplication::NoChangesNeeded) => {
                if self.verbose() {
                    debug!(order_id = order.id, %rate, "No changes were needed for shipping tax fix");
                }
                ApplyOutcome::failed(FixStatus::NoChangesNeeded, "No changes were needed")
            }
            Ok(FixApplication::NoShippingItems) => {
                if self.verbose() {
                    debug!(order_id = order.id, "No shipping items found for tax fix");
                }
                ApplyOutcome::failed(FixStatus::NoShippingItems, "No shipping items found")
            }
            Err(err) => {
                warn!(order_id = order.id, error = %err, "Shipping tax fix aborted");
                ApplyOutcome::failed(FixStatus::RateUnresolved, err.to_string())
            }
        }
    }

    /// Loads an order, applies the fix, and saves it back.
    ///
    /// When order notes are enabled a note with the before/after amounts is
    /// added afterwards. Failing to write the note is logged and does not
    /// change the outcome.
    pub fn apply_to_stored<S>(&self, store: &S, order_id: OrderId, rate_percent: u32) -> ApplyOutcome
    where
        S: OrderStore + ?Sized,
    {
        let Some(rate) = self.target_rate(rate_percent) else {
            return Self::unsupported(rate_percent);
        };

        let mut order = match store.get(order_id) {
            Ok(order) => order,
            Err(err) => return Self::storage_failure(order_id, err),
        };

        let outcome = self.apply_rate(&mut order, rate);
        if !outcome.success {
            return outcome;
        }

        if let Err(err) = store.save(&order) {
            return Self::storage_failure(order_id, err);
        }

        if self.settings().general.create_order_note {
            let note = applied_fix_note(rate, &outcome.changes, self.settings().display_precision());
            if let Err(err) = store.add_note(order_id, OrderNote::new(note)) {
                warn!(order_id, error = %err, "Failed to write shipping tax fix note");
            }
        }

        outcome
    }

    fn storage_failure(order_id: OrderId, err: EngineError) -> ApplyOutcome {
        warn!(order_id, error = %err, "Shipping tax fix could not access order");
        let status = match err {
            EngineError::OrderNotFound { .. } => FixStatus::OrderNotFound,
            _ => FixStatus::StorageFailed,
        };
        ApplyOutcome::failed(status, err.to_string())
    }

    /// Derives the effective shipping tax rate of an order.
    pub fn effective_rate(&self, order: &Order) -> EffectiveRate {
        get_effective_rate(order)
    }

    /// Recomputes and stores the shipping tax rate annotation of an order.
    pub fn refresh_rate_meta<S>(&self, store: &S, order_id: OrderId) -> EngineResult<EffectiveRate>
    where
        S: OrderStore + ?Sized,
    {
        let order = store.get(order_id)?;
        let rate = get_effective_rate(&order);
        if self.verbose() {
            debug!(order_id, %rate, "Updating shipping tax rate annotation");
        }
        store.set_shipping_tax_rate(order_id, rate)?;
        Ok(rate)
    }
}
