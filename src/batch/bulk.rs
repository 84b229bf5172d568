//! Bulk preview and apply over a selection of orders.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calculation::preview_note;
use crate::engine::TaxFixEngine;
use crate::error::EngineResult;
use crate::models::{FixStatus, OrderId, OrderNote, TargetRate};
use crate::store::OrderStore;

/// What a bulk run does to each selected order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Leave a note with the proposed split for every shipping line.
    Preview,
    /// Apply the fix.
    Apply,
}

/// Counters from a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    /// The action that was run.
    pub action: BulkAction,
    /// Target rate percentage.
    pub rate: u32,
    /// Orders that were found and handled.
    pub processed: usize,
    /// Orders the fix was applied to.
    pub changed: usize,
    /// Orders that could not be processed.
    pub errors: usize,
}

impl BulkSummary {
    fn new(action: BulkAction, rate: TargetRate) -> Self {
        Self {
            action,
            rate: rate.percent(),
            processed: 0,
            changed: 0,
            errors: 0,
        }
    }

    /// Renders the notice shown after the run.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipping_tax_fix::batch::{BulkAction, BulkSummary};
    ///
    /// let summary = BulkSummary {
    ///     action: BulkAction::Apply,
    ///     rate: 25,
    ///     processed: 3,
    ///     changed: 2,
    ///     errors: 1,
    /// };
    /// assert_eq!(
    ///     summary.message(),
    ///     "Shipping tax fix (25%) applied to 2 out of 3 orders. 1 order could not be processed."
    /// );
    /// ```
    pub fn message(&self) -> String {
        match self.action {
            BulkAction::Preview => format!(
                "Shipping tax preview ({}%) generated for {} {}. Check order notes for details.",
                self.rate,
                self.processed,
                plural(self.processed, "order", "orders"),
            ),
            BulkAction::Apply => {
                let mut message = format!(
                    "Shipping tax fix ({}%) applied to {} out of {} orders.",
                    self.rate, self.changed, self.processed
                );
                if self.errors > 0 {
                    message.push_str(&format!(
                        " {} {} could not be processed.",
                        self.errors,
                        plural(self.errors, "order", "orders"),
                    ));
                }
                message
            }
        }
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Runs a bulk preview or apply over `order_ids`.
///
/// Unknown orders are counted as errors and skipped; the remaining orders are
/// still handled. Fails up front only when the rate is unsupported.
pub fn run_bulk_action<S>(
    engine: &TaxFixEngine,
    store: &S,
    order_ids: &[OrderId],
    action: BulkAction,
    rate_percent: u32,
) -> EngineResult<BulkSummary>
where
    S: OrderStore + ?Sized,
{
    let rate = TargetRate::try_from(rate_percent)?;
    let precision = engine.settings().display_precision();
    let mut summary = BulkSummary::new(action, rate);

    for &order_id in order_ids {
        let order = match store.get(order_id) {
            Ok(order) => order,
            Err(err) => {
                warn!(order_id, error = %err, "Skipping order in bulk shipping tax action");
                summary.errors += 1;
                continue;
            }
        };
        summary.processed += 1;

        match action {
            BulkAction::Preview => {
                for calc in engine.calculate(&order, rate.percent()) {
                    let note = OrderNote::new(preview_note(rate, &calc, precision));
                    if let Err(err) = store.add_note(order_id, note) {
                        warn!(order_id, error = %err, "Failed to write preview note");
                    }
                }
            }
            BulkAction::Apply => {
                let outcome = engine.apply_to_stored(store, order_id, rate.percent());
                if outcome.success {
                    summary.changed += 1;
                } else if matches!(
                    outcome.status,
                    FixStatus::StorageFailed | FixStatus::OrderNotFound
                ) {
                    summary.errors += 1;
                }
            }
        }
    }

    if engine.settings().general.enable_logging {
        info!(
            ?action,
            rate = summary.rate,
            processed = summary.processed,
            changed = summary.changed,
            errors = summary.errors,
            "Bulk shipping tax action finished"
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, Settings};
    use crate::error::EngineError;
    use crate::models::{LineItem, Order, TaxRateRecord, TaxRateTable};
    use crate::store::InMemoryOrderStore;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine() -> TaxFixEngine {
        let rates = TaxRateTable::new(vec![
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
        ]);
        TaxFixEngine::new(EngineConfig::new(Settings::default(), rates))
    }

    fn store() -> InMemoryOrderStore {
        let store = InMemoryOrderStore::new();
        store
            .insert(Order::new(
                1,
                Utc::now(),
                vec![LineItem::shipping(1, "Flat rate", dec("86.96"), [(2, dec("13.04"))])],
            ))
            .unwrap();
        store
            .insert(Order::new(
                2,
                Utc::now(),
                vec![LineItem::shipping(1, "Flat rate", dec("80.00"), [(1, dec("20.00"))])],
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_bulk_apply_counts_changed_and_errors() {
        let store = store();

        let summary = run_bulk_action(&engine(), &store, &[1, 2, 99], BulkAction::Apply, 25).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(store.get(1).unwrap().items[0].total, dec("80.00"));
        assert_eq!(
            summary.message(),
            "Shipping tax fix (25%) applied to 1 out of 2 orders. 1 order could not be processed."
        );
    }

    #[test]
    fn test_bulk_preview_adds_notes_without_changing_orders() {
        let store = store();

        let summary = run_bulk_action(&engine(), &store, &[1], BulkAction::Preview, 25).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.changed, 0);
        let order = store.get(1).unwrap();
        assert_eq!(order.items[0].total, dec("86.96"));
        assert_eq!(order.notes.len(), 1);
        assert!(order.notes[0].message.starts_with("Bulk Preview (25%): Flat rate"));
        assert_eq!(
            summary.message(),
            "Shipping tax preview (25%) generated for 1 order. Check order notes for details."
        );
    }

    #[test]
    fn test_bulk_rejects_unsupported_rate() {
        let store = store();
        match run_bulk_action(&engine(), &store, &[1], BulkAction::Apply, 12) {
            Err(EngineError::UnsupportedRate { rate }) => assert_eq!(rate, 12),
            other => panic!("Expected UnsupportedRate, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_message_without_errors() {
        let summary = BulkSummary {
            action: BulkAction::Apply,
            rate: 15,
            processed: 4,
            changed: 4,
            errors: 0,
        };
        assert_eq!(summary.message(), "Shipping tax fix (15%) applied to 4 out of 4 orders.");
    }
}
