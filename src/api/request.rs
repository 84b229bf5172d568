//! Request types for the shipping tax fix API.

use serde::{Deserialize, Serialize};

use crate::batch::BulkAction;
use crate::models::OrderId;

/// Body of the single-order calculate and apply endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRequest {
    /// Target rate percentage (15 or 25).
    pub rate: u32,
}

/// Body of `POST /orders/bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    /// Orders to process.
    pub order_ids: Vec<OrderId>,
    /// Target rate percentage (15 or 25).
    pub rate: u32,
    /// Preview or apply.
    pub action: BulkAction,
}

/// Query parameters of `GET /orders`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderListParams {
    /// Rate filter: `15`, `25`, `0`, `other` or `none`.
    #[serde(default)]
    pub shipping_tax_rate: Option<String>,
}
