//! Core data models for the shipping tax fix engine.
//!
//! This module contains all the domain models used throughout the engine.

mod order;
mod shipping_rate;
mod tax_fix;
mod tax_rate;

pub use order::{
    LineItem, LineItemKind, Order, OrderId, OrderMeta, OrderNote, OrderTotals, RateTotals,
    TaxBreakdown, TaxLine, TaxRateId,
};
pub use shipping_rate::{EffectiveRate, NO_SHIPPING, RateClass, RateFilter, UnknownRateFilter};
pub use tax_fix::{ApplyOutcome, FixPreview, FixStatus, PreviewSide, PreviewTax, TaxCalculation};
pub use tax_rate::{TargetRate, TaxRateRecord, TaxRateTable};
