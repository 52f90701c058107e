//! Order management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::orders::{DispatchPayload, OrderFilter, OrderPayload, OrderService};
use crate::AppState;

/// List orders, optionally searched and sorted
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.list_orders(&filter).await {
        Ok(orders) => {
            (StatusCode::OK, Json(serde_json::json!({ "orders": orders }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Get a specific order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.get_order(order_id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new order
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<OrderPayload>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.create_order(payload).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Replace an order's full record
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(payload): Json<OrderPayload>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.update_order(order_id, payload).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete an order; removing a missing id reports zero rows, not an error
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.delete_order(order_id).await {
        Ok(deleted) => {
            (StatusCode::OK, Json(serde_json::json!({ "deleted": deleted }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Record a dispatch reconciliation for an order
pub async fn record_dispatch(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(payload): Json<DispatchPayload>,
) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.record_dispatch(order_id, payload.delivered).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Aggregate payment-status counts
pub async fn payment_summary(State(state): State<AppState>) -> impl IntoResponse {
    let service = OrderService::new(state.db.clone());

    match service.payment_summary().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}
