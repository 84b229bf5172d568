//! Calculation logic for the shipping tax fix engine.
//!
//! This module contains the pure functions the engine is built from:
//! decomposition of inclusive shipping totals under a target rate, tax rate
//! identifier resolution, tax summary reconstruction, effective rate
//! derivation, previews, applying a fix, and order note text.

mod apply;
mod decomposition;
mod effective_rate;
mod notes;
mod preview;
mod rate_resolution;
mod tax_summary;

pub use apply::{FixApplication, apply_shipping_tax_fix};
pub use decomposition::{
    CENT_TOLERANCE, calculate_shipping_tax_fix, decompose_inclusive_total, round_currency,
};
pub use effective_rate::get_effective_rate;
pub use notes::{applied_fix_note, format_amount, preview_note};
pub use preview::preview_shipping_tax_fix;
pub use rate_resolution::{RATE_MATCH_TOLERANCE, resolve_tax_rate_id};
pub use tax_summary::rebuild_tax_summary;
