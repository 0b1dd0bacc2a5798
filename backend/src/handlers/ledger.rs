//! HTTP handlers for balance-ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{LedgerEntry, LedgerService};
use crate::AppState;

/// List ledger entries for the tenant, newest first
pub async fn list_ledger_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let service = LedgerService::new(state.db);
    let entries = service.list(current_user.0.tenant_id).await?;
    Ok(Json(entries))
}

/// List ledger entries for one product, newest first
pub async fn list_product_ledger_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let service = LedgerService::new(state.db);
    let entries = service
        .list_for_product(current_user.0.tenant_id, product_id)
        .await?;
    Ok(Json(entries))
}
