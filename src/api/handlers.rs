//! HTTP request handlers for the shipping tax fix API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::{
    JobState, MetaUpdateRequest, cancel_meta_update, process_meta_batch, run_bulk_action,
    schedule_meta_update,
};
use crate::error::EngineError;
use crate::models::{FixStatus, OrderId, RateFilter, TargetRate};
use crate::store::OrderQuery;

use super::request::{BulkRequest, OrderListParams, RateRequest};
use super::response::{
    ApiError, ApiErrorResponse, BulkResponse, CalculateResponse, MetaUpdateResponse,
    OrderListEntry, OrderListResponse, OrderRateResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
///
/// The order listing is only mounted when
/// `general.enable_order_list_column` is set.
pub fn create_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new()
        .route("/orders/bulk", post(bulk_handler))
        .route("/orders/:id/calculate", post(calculate_handler))
        .route("/orders/:id/apply", post(apply_handler))
        .route("/orders/:id/shipping-tax-rate", get(shipping_tax_rate_handler))
        .route("/tools/meta-update/start", post(meta_update_start_handler))
        .route("/tools/meta-update/run", post(meta_update_run_handler))
        .route("/tools/meta-update/stop", post(meta_update_stop_handler));

    if state.engine().settings().general.enable_order_list_column {
        router = router.route("/orders", get(list_orders_handler));
    }

    router.with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}

fn error_response(correlation_id: Uuid, err: EngineError) -> Response {
    warn!(correlation_id = %correlation_id, error = %err, "Request failed");
    let api_error: ApiErrorResponse = err.into();
    json_response(api_error.status, api_error.error)
}

fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's description of the problem
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for `GET /orders`.
///
/// Lists orders newest first, optionally filtered by their shipping tax rate
/// annotation.
async fn list_orders_handler(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    let rate_filter = match params.shipping_tax_rate.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<RateFilter>() {
            Ok(filter) => Some(filter),
            Err(err) => {
                warn!(correlation_id = %correlation_id, filter = raw, "Unknown rate filter");
                return json_response(
                    StatusCode::BAD_REQUEST,
                    ApiError::validation_error(err.to_string()),
                );
            }
        },
    };

    let query = OrderQuery {
        rate_filter,
        ..OrderQuery::default()
    };
    let ids = match state.orders().query(&query) {
        Ok(ids) => ids,
        Err(err) => return error_response(correlation_id, err),
    };

    let mut orders = Vec::with_capacity(ids.len());
    for order_id in ids {
        match state.orders().get(order_id) {
            Ok(order) => orders.push(OrderListEntry::new(order_id, order.meta.shipping_tax_rate)),
            Err(err) => return error_response(correlation_id, err),
        }
    }

    json_response(StatusCode::OK, OrderListResponse { orders })
}

/// Handler for `POST /orders/:id/calculate`.
///
/// Returns the per-line calculations and the order-level preview without
/// changing the order.
async fn calculate_handler(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, order_id, "Processing shipping tax calculation");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let rate = match TargetRate::try_from(request.rate) {
        Ok(rate) => rate,
        Err(err) => return error_response(correlation_id, err),
    };

    let order = match state.orders().get(order_id) {
        Ok(order) => order,
        Err(err) => return error_response(correlation_id, err),
    };

    let engine = state.engine();
    let calculations = engine.calculate(&order, rate.percent());
    let preview = engine.preview(&order, rate.percent());

    json_response(
        StatusCode::OK,
        CalculateResponse {
            order_id,
            rate: rate.percent(),
            calculations,
            preview,
        },
    )
}

/// Handler for `POST /orders/:id/apply`.
///
/// Responds 200 with the outcome when the fix was applied and 422 when the
/// engine declined (no shipping, nothing to change, unknown rate).
async fn apply_handler(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, order_id, "Processing shipping tax fix");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    let outcome = state
        .engine()
        .apply_to_stored(state.orders(), order_id, request.rate);

    match outcome.status {
        FixStatus::OrderNotFound => {
            error_response(correlation_id, EngineError::OrderNotFound { order_id })
        }
        FixStatus::StorageFailed => {
            warn!(correlation_id = %correlation_id, error = %outcome.message, "Request failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("STORAGE_ERROR", "Storage failure", outcome.message),
            )
        }
        _ if outcome.success => {
            info!(
                correlation_id = %correlation_id,
                order_id,
                changed_items = outcome.changes.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Shipping tax fix completed"
            );
            json_response(StatusCode::OK, outcome)
        }
        _ => {
            info!(
                correlation_id = %correlation_id,
                order_id,
                status = ?outcome.status,
                "Shipping tax fix not applied"
            );
            json_response(StatusCode::UNPROCESSABLE_ENTITY, outcome)
        }
    }
}

/// Handler for `GET /orders/:id/shipping-tax-rate`.
async fn shipping_tax_rate_handler(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    match state.orders().get(order_id) {
        Ok(order) => {
            let rate = state.engine().effective_rate(&order);
            json_response(StatusCode::OK, OrderRateResponse::new(order_id, rate))
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /orders/bulk`.
async fn bulk_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        orders = request.order_ids.len(),
        action = ?request.action,
        rate = request.rate,
        "Processing bulk shipping tax action"
    );

    match run_bulk_action(
        state.engine(),
        state.orders(),
        &request.order_ids,
        request.action,
        request.rate,
    ) {
        Ok(summary) => json_response(
            StatusCode::OK,
            BulkResponse {
                message: summary.message(),
                summary,
            },
        ),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /tools/meta-update/start`.
async fn meta_update_start_handler(
    State(state): State<AppState>,
    payload: Result<Json<MetaUpdateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    match schedule_meta_update(state.engine(), state.orders(), state.checkpoints(), &request) {
        Ok(job) => {
            info!(
                correlation_id = %correlation_id,
                orders = job.remaining_ids.len(),
                "Order meta update scheduled"
            );
            json_response(
                StatusCode::OK,
                MetaUpdateResponse {
                    message: "Order meta update process has been scheduled.".to_string(),
                    scheduled: Some(job.remaining_ids.len()),
                    progress: None,
                },
            )
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /tools/meta-update/run`.
///
/// Runs one batch of the scheduled job.
async fn meta_update_run_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();

    match process_meta_batch(state.engine(), state.orders(), state.checkpoints()) {
        Ok(Some(progress)) => {
            let message = match progress.state {
                JobState::InProgress => format!(
                    "Processed {} orders, {} remaining.",
                    progress.processed, progress.remaining
                ),
                JobState::Complete => "Order meta update complete.".to_string(),
                JobState::Cancelled => "Order meta update process has been stopped.".to_string(),
            };
            json_response(
                StatusCode::OK,
                MetaUpdateResponse {
                    message,
                    scheduled: None,
                    progress: Some(progress),
                },
            )
        }
        Ok(None) => json_response(
            StatusCode::OK,
            MetaUpdateResponse {
                message: "No order meta update is scheduled.".to_string(),
                scheduled: None,
                progress: None,
            },
        ),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /tools/meta-update/stop`.
async fn meta_update_stop_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();

    match cancel_meta_update(state.checkpoints()) {
        Ok(_) => {
            info!(correlation_id = %correlation_id, "Order meta update stopped");
            json_response(
                StatusCode::OK,
                MetaUpdateResponse {
                    message: "Order meta update process has been stopped.".to_string(),
                    scheduled: None,
                    progress: None,
                },
            )
        }
        Err(err) => error_response(correlation_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::InMemoryCheckpointStore;
    use crate::config::ConfigLoader;
    use crate::engine::TaxFixEngine;
    use crate::models::{LineItem, Order};
    use crate::store::{InMemoryOrderStore, OrderStore};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::str::FromStr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_state() -> (AppState, Arc<InMemoryOrderStore>) {
        let config = ConfigLoader::load("./config/default").unwrap();
        let orders = Arc::new(InMemoryOrderStore::new());
        orders
            .insert(Order::new(
                100,
                Utc::now(),
                vec![
                    LineItem::product(1, "Coffee", dec("200.00"), [(1, dec("50.00"))]),
                    LineItem::shipping(2, "Flat rate", dec("86.96"), [(2, dec("13.04"))]),
                ],
            ))
            .unwrap();
        let state = AppState::with_stores(
            TaxFixEngine::from_loader(&config),
            orders.clone(),
            Arc::new(InMemoryCheckpointStore::new()),
        );
        (state, orders)
    }

    async fn send(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_calculate_returns_preview() {
        let (state, _) = create_test_state();

        let (status, json) = send(
            create_router(state),
            "POST",
            "/orders/100/calculate",
            r#"{"rate": 25}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let new_base = json["calculations"][0]["new_base"].as_str().unwrap();
        assert_eq!(dec(new_base), dec("80.00"));
        assert_eq!(json["calculations"][0]["needs_update"], true);
        assert_eq!(json["preview"]["target_rate_id"], 1);
    }

    #[tokio::test]
    async fn test_apply_then_reapply() {
        let (state, orders) = create_test_state();
        let router = create_router(state);

        let (status, json) =
            send(router.clone(), "POST", "/orders/100/apply", r#"{"rate": 25}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(orders.get(100).unwrap().totals.total, dec("350.00"));

        let (status, json) = send(router, "POST", "/orders/100/apply", r#"{"rate": 25}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["status"], "no_changes_needed");
    }

    #[tokio::test]
    async fn test_unknown_order_returns_404() {
        let (state, _) = create_test_state();

        let (status, json) =
            send(create_router(state), "POST", "/orders/9/apply", r#"{"rate": 25}"#).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let (state, _) = create_test_state();

        let (status, json) =
            send(create_router(state), "POST", "/orders/100/apply", "{ not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "MALFORMED_JSON");
    }
}
