//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::TaxRateTable;

use super::types::{EngineConfig, Settings, TaxRatesConfig};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── settings.yaml   # General, precision, item rounding and batch settings
/// └── tax_rates.yaml  # The store's configured tax rates
/// ```
///
/// # Example
///
/// ```no_run
/// use shipping_tax_fix::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("{} tax rates configured", loader.tax_rates().rates().len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if a file is missing, contains invalid YAML, or a
    /// setting is out of range.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<Settings>(&path.join("settings.yaml"))?;
        settings.validate()?;

        let rates = Self::load_yaml::<TaxRatesConfig>(&path.join("tax_rates.yaml"))?;

        Ok(Self {
            config: EngineConfig::new(settings, TaxRateTable::new(rates.tax_rates)),
        })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        self.config.settings()
    }

    /// Returns the configured tax rates.
    pub fn tax_rates(&self) -> &TaxRateTable {
        self.config.tax_rates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert!(loader.settings().general.create_order_note);
        assert_eq!(loader.settings().batch.batch_size, 50);
    }

    #[test]
    fn test_tax_rates_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rates = loader.tax_rates();

        assert_eq!(rates.find_by_rounded_percent(25), Some(1));
        assert_eq!(rates.find_by_rounded_percent(15), Some(2));
        assert_eq!(rates.rate_by_id(3), Some(Decimal::from_str("12.0000").unwrap()));
        assert_eq!(rates.label_for(1), Some("MVA 25%"));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("settings.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }
}
