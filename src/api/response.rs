//! Response types for the shipping tax fix API.
//!
//! This module defines the response bodies and the error handling for the
//! HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchProgress, BulkSummary};
use crate::error::EngineError;
use crate::models::{EffectiveRate, FixPreview, OrderId, RateClass, TaxCalculation};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidSetting { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            },
            EngineError::UnsupportedRate { .. } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "UNSUPPORTED_RATE",
                    message,
                    "Supported shipping tax rates are 15% and 25%",
                ),
            },
            EngineError::RateResolutionFailed { .. } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::new("RATE_UNRESOLVED", message),
            },
            EngineError::OrderNotFound { .. } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new("ORDER_NOT_FOUND", message),
            },
            EngineError::Storage { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("STORAGE_ERROR", "Storage failure", message),
            },
        }
    }
}

/// Body of `POST /orders/:id/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    /// The order the calculation is for.
    pub order_id: OrderId,
    /// Target rate percentage.
    pub rate: u32,
    /// One entry per chargeable shipping line.
    pub calculations: Vec<TaxCalculation>,
    /// Order-level before/after view, absent when there is nothing to fix.
    pub preview: Option<FixPreview>,
}

/// Shipping tax rate of one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRateResponse {
    /// The order.
    pub order_id: OrderId,
    /// Annotation value (`-1` for no shipping).
    pub shipping_tax_rate: i64,
    /// Display class.
    pub class: RateClass,
    /// Display text, e.g. `25%` or `No shipping`.
    pub display: String,
}

impl OrderRateResponse {
    /// Builds the response for an effective rate.
    pub fn new(order_id: OrderId, rate: EffectiveRate) -> Self {
        Self {
            order_id,
            shipping_tax_rate: rate.meta_value(),
            class: rate.class(),
            display: rate.to_string(),
        }
    }
}

/// One row of the order listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListEntry {
    /// The order.
    pub order_id: OrderId,
    /// Stored annotation, absent for orders not processed yet.
    pub shipping_tax_rate: Option<i64>,
    /// Display class of the annotation.
    pub class: Option<RateClass>,
}

impl OrderListEntry {
    /// Builds a row from a stored annotation value.
    pub fn new(order_id: OrderId, annotation: Option<i64>) -> Self {
        Self {
            order_id,
            shipping_tax_rate: annotation,
            class: annotation.map(|value| EffectiveRate::from_meta_value(value).class()),
        }
    }
}

/// Body of `GET /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Matching orders, newest first.
    pub orders: Vec<OrderListEntry>,
}

/// Body of `POST /orders/bulk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Notice text.
    pub message: String,
    /// Counters.
    pub summary: BulkSummary,
}

/// Body of the meta-update tool endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaUpdateResponse {
    /// Notice text.
    pub message: String,
    /// Orders scheduled, when a job was started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<usize>,
    /// Progress, when a batch was run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<BatchProgress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_engine_error_to_api_error() {
        let api_error: ApiErrorResponse = EngineError::OrderNotFound { order_id: 12 }.into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.error.code, "ORDER_NOT_FOUND");
        assert_eq!(api_error.error.message, "Order not found: 12");

        let api_error: ApiErrorResponse = EngineError::UnsupportedRate { rate: 20 }.into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.code, "UNSUPPORTED_RATE");
    }

    #[test]
    fn test_order_rate_response_for_no_shipping() {
        let response = OrderRateResponse::new(4, EffectiveRate::NoShipping);
        assert_eq!(response.shipping_tax_rate, -1);
        assert_eq!(response.class, RateClass::NoShipping);
        assert_eq!(response.display, "No shipping");
    }
}
