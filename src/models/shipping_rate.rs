//! Effective shipping tax rate annotation.
//!
//! Orders are annotated with the whole-percentage rate their shipping lines
//! are effectively taxed at, or `-1` when they have no shipping. Listings
//! filter and colour orders by that annotation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Annotation value stored for orders without shipping.
pub const NO_SHIPPING: i64 = -1;

/// The shipping tax rate an order is effectively charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveRate {
    /// The order has no shipping lines.
    NoShipping,
    /// Rounded percentage of shipping tax over shipping base.
    Percent(i64),
}

impl EffectiveRate {
    /// Returns the value persisted in the order annotation.
    pub fn meta_value(self) -> i64 {
        match self {
            EffectiveRate::NoShipping => NO_SHIPPING,
            EffectiveRate::Percent(p) => p,
        }
    }

    /// Reads an annotation value back.
    pub fn from_meta_value(value: i64) -> Self {
        if value == NO_SHIPPING {
            EffectiveRate::NoShipping
        } else {
            EffectiveRate::Percent(value)
        }
    }

    /// Classifies the rate for display. Negative rates are shown like orders
    /// without shipping.
    pub fn class(self) -> RateClass {
        match self {
            EffectiveRate::NoShipping => RateClass::NoShipping,
            EffectiveRate::Percent(p) if p < 0 => RateClass::NoShipping,
            EffectiveRate::Percent(0) => RateClass::Zero,
            EffectiveRate::Percent(15) => RateClass::Reduced,
            EffectiveRate::Percent(25) => RateClass::Standard,
            EffectiveRate::Percent(_) => RateClass::Other,
        }
    }
}

impl fmt::Display for EffectiveRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveRate::NoShipping => f.write_str("No shipping"),
            EffectiveRate::Percent(p) => write!(f, "{}%", p),
        }
    }
}

/// Display class of an effective rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateClass {
    /// Exactly 15%.
    Reduced,
    /// Exactly 25%.
    Standard,
    /// Exactly 0%.
    Zero,
    /// Any other positive rate.
    Other,
    /// No shipping on the order, or a negative rate.
    NoShipping,
}

/// Listing filter over the shipping tax rate annotation.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::models::RateFilter;
///
/// let filter: RateFilter = "other".parse().unwrap();
/// assert!(filter.matches(20));
/// assert!(!filter.matches(15));
/// assert!(!filter.matches(-1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateFilter {
    /// Annotation between 14 and 16 inclusive.
    #[serde(rename = "15")]
    Reduced,
    /// Annotation between 24 and 26 inclusive.
    #[serde(rename = "25")]
    Standard,
    /// Annotation exactly 0.
    #[serde(rename = "0")]
    Zero,
    /// Positive annotation outside both bands.
    #[serde(rename = "other")]
    Other,
    /// Orders without shipping.
    #[serde(rename = "none")]
    NoShipping,
}

impl RateFilter {
    /// Returns true if an annotation value passes the filter.
    pub fn matches(self, value: i64) -> bool {
        let in_reduced = (14..=16).contains(&value);
        let in_standard = (24..=26).contains(&value);
        match self {
            RateFilter::Reduced => in_reduced,
            RateFilter::Standard => in_standard,
            RateFilter::Zero => value == 0,
            RateFilter::Other => value > 0 && !in_reduced && !in_standard,
            RateFilter::NoShipping => value == NO_SHIPPING,
        }
    }
}

/// Error returned when a filter string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRateFilter(pub String);

impl fmt::Display for UnknownRateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shipping tax rate filter: {}", self.0)
    }
}

impl std::error::Error for UnknownRateFilter {}

impl FromStr for RateFilter {
    type Err = UnknownRateFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15" => Ok(RateFilter::Reduced),
            "25" => Ok(RateFilter::Standard),
            "0" => Ok(RateFilter::Zero),
            "other" => Ok(RateFilter::Other),
            "none" => Ok(RateFilter::NoShipping),
            _ => Err(UnknownRateFilter(s.to_string())),
        }
    }
}
