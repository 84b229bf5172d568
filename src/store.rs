//! Order persistence.
//!
//! The engine reads and writes orders through the [`OrderStore`] trait so that
//! any host storage layer can sit behind it. [`InMemoryOrderStore`] is the
//! implementation used by the HTTP API and the tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{EngineError, EngineResult};
use crate::models::{EffectiveRate, Order, OrderId, OrderNote, RateFilter};

/// Selection criteria for listing orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    /// Only orders placed on or after this date.
    #[serde(default)]
    pub created_from: Option<NaiveDate>,
    /// Only orders placed on or before this date.
    #[serde(default)]
    pub created_to: Option<NaiveDate>,
    /// Only orders without a shipping tax rate annotation.
    #[serde(default)]
    pub missing_rate_meta: bool,
    /// Only orders whose annotation passes this filter.
    #[serde(default)]
    pub rate_filter: Option<RateFilter>,
    /// At most this many ids.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl OrderQuery {
    /// Returns true if the order satisfies every criterion except `limit`.
    pub fn matches(&self, order: &Order) -> bool {
        let date = order.created_at.date_naive();
        if self.created_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| date > to) {
            return false;
        }
        if self.missing_rate_meta && order.meta.shipping_tax_rate.is_some() {
            return false;
        }
        if let Some(filter) = self.rate_filter {
            return order
                .meta
                .shipping_tax_rate
                .is_some_and(|value| filter.matches(value));
        }
        true
    }
}

/// Storage for orders and their annotations.
pub trait OrderStore: Send + Sync {
    /// Loads an order.
    fn get(&self, order_id: OrderId) -> EngineResult<Order>;

    /// Replaces a stored order with `order`.
    fn save(&self, order: &Order) -> EngineResult<()>;

    /// Appends a note to an order.
    fn add_note(&self, order_id: OrderId, note: OrderNote) -> EngineResult<()>;

    /// Writes the shipping tax rate annotation of an order.
    fn set_shipping_tax_rate(&self, order_id: OrderId, rate: EffectiveRate) -> EngineResult<()>;

    /// Lists matching order ids, newest first.
    fn query(&self, query: &OrderQuery) -> EngineResult<Vec<OrderId>>;
}

/// Thread-safe in-memory order store.
///
/// When item rounding is configured, item totals and tax amounts are rounded
/// as orders are inserted and the order totals are re-derived from them.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<BTreeMap<OrderId, Order>>,
    item_precision: Option<u32>,
}

impl InMemoryOrderStore {
    /// Creates an empty store without item rounding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store honouring the item rounding settings.
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            orders: RwLock::default(),
            item_precision: settings.item_precision(),
        }
    }

    /// Inserts or replaces an order, applying item rounding if configured.
    pub fn insert(&self, mut order: Order) -> EngineResult<()> {
        if let Some(precision) = self.item_precision {
            let round = |amount: Decimal| {
                amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
            };
            for item in &mut order.items {
                item.total = round(item.total);
                for amount in item.taxes.values_mut() {
                    *amount = round(*amount);
                }
            }
            order.recompute_totals();
        }

        self.write()?.insert(order.id, order);
        Ok(())
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.orders.read().map(|orders| orders.len()).unwrap_or(0)
    }

    /// Returns true if no orders are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> EngineResult<std::sync::RwLockReadGuard<'_, BTreeMap<OrderId, Order>>> {
        self.orders.read().map_err(|_| EngineError::Storage {
            message: "order store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> EngineResult<std::sync::RwLockWriteGuard<'_, BTreeMap<OrderId, Order>>> {
        self.orders.write().map_err(|_| EngineError::Storage {
            message: "order store lock poisoned".to_string(),
        })
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, order_id: OrderId) -> EngineResult<Order> {
        self.read()?
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::OrderNotFound { order_id })
    }

    fn save(&self, order: &Order) -> EngineResult<()> {
        let mut orders = self.write()?;
        match orders.get_mut(&order.id) {
            Some(stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(EngineError::OrderNotFound { order_id: order.id }),
        }
    }

    fn add_note(&self, order_id: OrderId, note: OrderNote) -> EngineResult<()> {
        self.write()?
            .get_mut(&order_id)
            .map(|order| order.notes.push(note))
            .ok_or(EngineError::OrderNotFound { order_id })
    }

    fn set_shipping_tax_rate(&self, order_id: OrderId, rate: EffectiveRate) -> EngineResult<()> {
        self.write()?
            .get_mut(&order_id)
            .map(|order| order.meta.shipping_tax_rate = Some(rate.meta_value()))
            .ok_or(EngineError::OrderNotFound { order_id })
    }

    fn query(&self, query: &OrderQuery) -> EngineResult<Vec<OrderId>> {
        let orders = self.read()?;
        let mut matching: Vec<&Order> = orders.values().filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|o| o.id)
            .collect())
    }
}
