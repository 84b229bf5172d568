//! Tax rate types.
//!
//! [`TargetRate`] is the closed set of percentages the engine can reallocate
//! shipping VAT to. [`TaxRateTable`] is the store's configured tax rates,
//! used to translate between rate identifiers and percentages.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::TaxRateId;

/// A VAT rate the engine can move shipping lines onto.
///
/// # Example
///
/// ```
/// use shipping_tax_fix::models::TargetRate;
/// use rust_decimal::Decimal;
///
/// let rate = TargetRate::try_from(25).unwrap();
/// assert_eq!(rate, TargetRate::Standard);
/// assert_eq!(rate.multiplier(), Decimal::new(25, 2));
/// assert!(TargetRate::try_from(12).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TargetRate {
    /// 15% (reduced rate).
    Reduced,
    /// 25% (standard rate).
    Standard,
}

impl TargetRate {
    /// All supported rates, lowest first.
    pub const ALL: [TargetRate; 2] = [TargetRate::Reduced, TargetRate::Standard];

    /// The rate as a whole percentage.
    pub fn percent(self) -> u32 {
        match self {
            TargetRate::Reduced => 15,
            TargetRate::Standard => 25,
        }
    }

    /// The rate as a decimal fraction (0.15, 0.25).
    pub fn multiplier(self) -> Decimal {
        Decimal::new(i64::from(self.percent()), 2)
    }

    /// Display label ("15%", "25%").
    pub fn label(self) -> &'static str {
        match self {
            TargetRate::Reduced => "15%",
            TargetRate::Standard => "25%",
        }
    }
}

impl TryFrom<u32> for TargetRate {
    type Error = EngineError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        match rate {
            15 => Ok(TargetRate::Reduced),
            25 => Ok(TargetRate::Standard),
            _ => Err(EngineError::UnsupportedRate { rate }),
        }
    }
}

impl From<TargetRate> for u32 {
    fn from(rate: TargetRate) -> Self {
        rate.percent()
    }
}

impl fmt::Display for TargetRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tax rate configured in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRateRecord {
    /// External identifier used to tag tax amounts.
    pub id: TaxRateId,
    /// The rate as a percentage (e.g. 25.0000).
    pub rate: Decimal,
    /// Display label.
    pub label: String,
}

/// The set of tax rates configured in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRateTable {
    rates: Vec<TaxRateRecord>,
}

impl TaxRateTable {
    /// Creates a table from its records, keeping their order.
    pub fn new(rates: Vec<TaxRateRecord>) -> Self {
        Self { rates }
    }

    /// Returns all records.
    pub fn rates(&self) -> &[TaxRateRecord] {
        &self.rates
    }

    /// Returns the percentage configured for a rate id.
    pub fn rate_by_id(&self, id: TaxRateId) -> Option<Decimal> {
        self.record(id).map(|r| r.rate)
    }

    /// Returns the label configured for a rate id.
    pub fn label_for(&self, id: TaxRateId) -> Option<&str> {
        self.record(id).map(|r| r.label.as_str())
    }

    /// Returns the first rate whose percentage rounds to `percent`.
    pub fn find_by_rounded_percent(&self, percent: u32) -> Option<TaxRateId> {
        let wanted = Decimal::from(percent);
        self.rates
            .iter()
            .find(|r| r.rate.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) == wanted)
            .map(|r| r.id)
    }

    fn record(&self, id: TaxRateId) -> Option<&TaxRateRecord> {
        self.rates.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn table() -> TaxRateTable {
        TaxRateTable::new(vec![
            TaxRateRecord {
                id: 1,
                rate: dec("25.0000"),
                label: "MVA 25%".to_string(),
            },
            TaxRateRecord {
                id: 2,
                rate: dec("14.6000"),
                label: "MVA 15%".to_string(),
            },
        ])
    }

    #[test]
    fn test_target_rate_multipliers() {
        assert_eq!(TargetRate::Reduced.multiplier(), dec("0.15"));
        assert_eq!(TargetRate::Standard.multiplier(), dec("0.25"));
    }

    #[test]
    fn test_unsupported_rate_rejected() {
        match TargetRate::try_from(0) {
            Err(EngineError::UnsupportedRate { rate }) => assert_eq!(rate, 0),
            other => panic!("Expected UnsupportedRate, got {:?}", other),
        }
    }

    #[test]
    fn test_target_rate_serializes_as_percentage() {
        let json = serde_json::to_string(&TargetRate::Reduced).unwrap();
        assert_eq!(json, "15");
        let parsed: TargetRate = serde_json::from_str("25").unwrap();
        assert_eq!(parsed, TargetRate::Standard);
        assert!(serde_json::from_str::<TargetRate>("20").is_err());
    }

    #[test]
    fn test_find_by_rounded_percent() {
        let table = table();
        assert_eq!(table.find_by_rounded_percent(25), Some(1));
        assert_eq!(table.find_by_rounded_percent(15), Some(2));
        assert_eq!(table.find_by_rounded_percent(12), None);
    }

    #[test]
    fn test_lookup_by_id() {
        let table = table();
        assert_eq!(table.rate_by_id(1), Some(dec("25.0000")));
        assert_eq!(table.label_for(2), Some("MVA 15%"));
        assert_eq!(table.rate_by_id(99), None);
    }
}
