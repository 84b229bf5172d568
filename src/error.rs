//! Error types for the shipping tax fix engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for the conditions that can occur while loading configuration, reading
//! orders, or resolving tax rates.

use thiserror::Error;

/// The main error type for the shipping tax fix engine.
///
/// Engine operations that a caller renders as a notice (calculate, apply)
/// never surface this type directly; they fold it into an
/// [`ApplyOutcome`](crate::models::ApplyOutcome). It is returned from
/// configuration loading and the order store.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::error::EngineError;
///
/// let error = EngineError::RateResolutionFailed { rate: 25 };
/// assert_eq!(error.to_string(), "Could not find tax rate ID for 25% rate");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A setting was present but outside its allowed range.
    #[error("Invalid setting '{field}': {message}")]
    InvalidSetting {
        /// The setting that was invalid.
        field: String,
        /// A description of what made the setting invalid.
        message: String,
    },

    /// The requested target rate is not one the engine supports.
    #[error("Invalid tax rate: {rate}%")]
    UnsupportedRate {
        /// The rejected percentage.
        rate: u32,
    },

    /// No configured tax rate identifier matches the target rate.
    #[error("Could not find tax rate ID for {rate}% rate")]
    RateResolutionFailed {
        /// The percentage that could not be resolved.
        rate: u32,
    },

    /// The order does not exist in the store.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order id.
        order_id: u64,
    },

    /// The underlying storage failed.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the failure.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
