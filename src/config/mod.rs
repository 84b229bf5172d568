//! Configuration loading and management for the shipping tax fix engine.
//!
//! This module provides functionality to load settings and the configured
//! tax rate table from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use shipping_tax_fix::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Batch size: {}", config.settings().batch.batch_size);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BatchSettings, DEFAULT_PRECISION, EngineConfig, GeneralSettings, ItemRoundingSettings,
    MAX_PRECISION, PrecisionSettings, Settings, TaxRatesConfig,
};
