//! HTTP handlers for product and costing-audit endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::costing::{Consumption, CostLayer, CostingService, ProductValuation};
use crate::services::product::{CreateProductInput, Product, ProductService};
use crate::AppState;

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.create(current_user.0.tenant_id, input).await?;
    Ok(Json(product))
}

/// List products for the tenant
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list(current_user.0.tenant_id).await?;
    Ok(Json(products))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get(current_user.0.tenant_id, product_id).await?;
    Ok(Json(product))
}

/// Archive a product (layers and consumptions are retained)
pub async fn archive_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.archive(current_user.0.tenant_id, product_id).await?;
    Ok(Json(product))
}

/// List cost layers for a product, FIFO order
pub async fn list_product_layers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<CostLayer>>> {
    let service = CostingService::new(state.db);
    let layers = service
        .list_layers(current_user.0.tenant_id, product_id)
        .await?;
    Ok(Json(layers))
}

/// Consumption trail for a product
pub async fn list_product_consumptions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<Consumption>>> {
    let service = CostingService::new(state.db);
    let consumptions = service
        .list_consumptions(current_user.0.tenant_id, product_id)
        .await?;
    Ok(Json(consumptions))
}

/// Value a product's on-hand stock from its active layers
pub async fn get_product_valuation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductValuation>> {
    let service = CostingService::new(state.db);
    let valuation = service
        .valuation(current_user.0.tenant_id, product_id)
        .await?;
    Ok(Json(valuation))
}
