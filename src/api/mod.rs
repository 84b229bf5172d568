//! HTTP API module for the shipping tax fix engine.
//!
//! This module provides the REST endpoints that inspect orders, preview and
//! apply shipping tax fixes, run bulk actions, and drive the meta-update job.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BulkRequest, OrderListParams, RateRequest};
pub use response::{
    ApiError, BulkResponse, CalculateResponse, MetaUpdateResponse, OrderListEntry,
    OrderListResponse, OrderRateResponse,
};
pub use state::AppState;
