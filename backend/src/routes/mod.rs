//! Route definitions for the Order Records API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Order CRUD and dispatch reconciliation
        .nest("/orders", order_routes())
        // Payment-status aggregates
        .route("/summary", get(handlers::payment_summary))
        // CSV interchange
        .route("/import", post(handlers::import_csv))
        .route("/export", get(handlers::export_csv))
}

/// Order management routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .route("/:order_id/dispatch", post(handlers::record_dispatch))
}
