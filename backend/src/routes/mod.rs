//! Route definitions for the Tradepost backend

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Protected routes - product catalog and costing audit
        .nest("/products", product_routes())
        // Protected routes - order placement
        .nest("/orders", order_routes())
        // Protected routes - inventory adjustments
        .nest("/adjustments", adjustment_routes())
        // Protected routes - balance ledger
        .nest("/ledger", ledger_routes())
}

/// Product and costing-audit routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/archive", post(handlers::archive_product))
        .route("/:product_id/layers", get(handlers::list_product_layers))
        .route(
            "/:product_id/consumptions",
            get(handlers::list_product_consumptions),
        )
        .route(
            "/:product_id/valuation",
            get(handlers::get_product_valuation),
        )
        .route(
            "/:product_id/ledger",
            get(handlers::list_product_ledger_entries),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Order routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::place_order))
        .route("/:order_id", get(handlers::get_order))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Adjustment routes (protected)
fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Ledger routes (protected)
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_ledger_entries))
        .route_layer(middleware::from_fn(auth_middleware))
}
