//! Application state for the shipping tax fix API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::batch::{CheckpointStore, InMemoryCheckpointStore};
use crate::config::ConfigLoader;
use crate::engine::TaxFixEngine;
use crate::store::{InMemoryOrderStore, OrderStore};

/// Shared application state.
///
/// Holds the engine together with the order store it fixes and the
/// checkpoint store of the meta-update job.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<TaxFixEngine>,
    orders: Arc<dyn OrderStore>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl AppState {
    /// Creates state from loaded configuration, backed by empty in-memory stores.
    pub fn new(config: ConfigLoader) -> Self {
        let orders = InMemoryOrderStore::with_settings(config.settings());
        Self::with_stores(
            TaxFixEngine::from_loader(&config),
            Arc::new(orders),
            Arc::new(InMemoryCheckpointStore::new()),
        )
    }

    /// Creates state over existing stores.
    pub fn with_stores(
        engine: TaxFixEngine,
        orders: Arc<dyn OrderStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            orders,
            checkpoints,
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &TaxFixEngine {
        &self.engine
    }

    /// Returns the order store.
    pub fn orders(&self) -> &dyn OrderStore {
        self.orders.as_ref()
    }

    /// Returns the meta-update checkpoint store.
    pub fn checkpoints(&self) -> &dyn CheckpointStore {
        self.checkpoints.as_ref()
    }
}
