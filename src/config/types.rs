//! Configuration types for the shipping tax fix engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Settings are a single
//! struct composed of optional sub-sections.

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{TaxRateRecord, TaxRateTable};

/// Highest decimal precision accepted for display or item rounding.
pub const MAX_PRECISION: u32 = 10;

/// Precision used when no override is configured.
pub const DEFAULT_PRECISION: u32 = 2;

fn default_true() -> bool {
    true
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_batch_size() -> usize {
    50
}

fn default_initial_limit() -> usize {
    200
}

/// General behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneralSettings {
    /// Whether listings show the shipping tax rate column and filter.
    #[serde(default)]
    pub enable_order_list_column: bool,
    /// Whether an order note is written after a fix is applied.
    #[serde(default = "default_true")]
    pub create_order_note: bool,
    /// Whether the engine emits its detailed diagnostic trail.
    #[serde(default)]
    pub enable_logging: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            enable_order_list_column: false,
            create_order_note: true,
            enable_logging: false,
        }
    }
}

/// Display precision override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrecisionSettings {
    /// Whether the override is active.
    #[serde(default)]
    pub enable_override: bool,
    /// Number of decimals used when displaying amounts.
    #[serde(default = "default_precision")]
    pub precision_value: u32,
}

/// Rounding applied to item totals when orders are stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRoundingSettings {
    /// Whether item totals are rounded on insert.
    #[serde(default)]
    pub enabled: bool,
    /// Number of decimals item totals are rounded to.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

/// Limits for background processing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchSettings {
    /// Maximum orders handled per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of newest orders scheduled when no date range is given.
    #[serde(default = "default_initial_limit")]
    pub initial_limit: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            initial_limit: default_initial_limit(),
        }
    }
}

/// All settings, as read from `settings.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// General switches.
    #[serde(default)]
    pub general: GeneralSettings,
    /// Optional display precision override.
    #[serde(default)]
    pub precision: Option<PrecisionSettings>,
    /// Optional item rounding for the order store.
    #[serde(default)]
    pub item_rounding: Option<ItemRoundingSettings>,
    /// Background processing limits.
    #[serde(default)]
    pub batch: BatchSettings,
}

impl Settings {
    /// Checks ranges that the YAML schema cannot express.
    pub fn validate(&self) -> EngineResult<()> {
        if self
            .precision
            .as_ref()
            .is_some_and(|p| p.precision_value > MAX_PRECISION)
        {
            return Err(EngineError::InvalidSetting {
                field: "precision.precision_value".to_string(),
                message: format!("must be between 0 and {}", MAX_PRECISION),
            });
        }

        if self
            .item_rounding
            .as_ref()
            .is_some_and(|r| r.precision > MAX_PRECISION)
        {
            return Err(EngineError::InvalidSetting {
                field: "item_rounding.precision".to_string(),
                message: format!("must be between 0 and {}", MAX_PRECISION),
            });
        }

        if self.batch.batch_size == 0 {
            return Err(EngineError::InvalidSetting {
                field: "batch.batch_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Decimals used when formatting amounts for notes and messages.
    pub fn display_precision(&self) -> u32 {
        match &self.precision {
            Some(p) if p.enable_override => p.precision_value,
            _ => DEFAULT_PRECISION,
        }
    }

    /// Decimals item totals are rounded to on insert, if rounding is on.
    pub fn item_precision(&self) -> Option<u32> {
        self.item_rounding
            .as_ref()
            .filter(|r| r.enabled)
            .map(|r| r.precision)
    }
}

/// Tax rates configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxRatesConfig {
    /// The configured rates.
    pub tax_rates: Vec<TaxRateRecord>,
}

/// The complete configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    settings: Settings,
    tax_rates: TaxRateTable,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    pub fn new(settings: Settings, tax_rates: TaxRateTable) -> Self {
        Self {
            settings,
            tax_rates,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the configured tax rates.
    pub fn tax_rates(&self) -> &TaxRateTable {
        &self.tax_rates
    }
}
