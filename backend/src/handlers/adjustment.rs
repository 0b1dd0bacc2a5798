//! HTTP handlers for inventory adjustment endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::adjustment::{
    Adjustment, AdjustmentResult, AdjustmentService, CreateAdjustmentInput,
};
use crate::AppState;

/// Apply an inventory adjustment
pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<Json<AdjustmentResult>> {
    let service = AdjustmentService::new(state.db);
    let result = service
        .apply(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

/// List adjustments for the tenant
pub async fn list_adjustments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Adjustment>>> {
    let service = AdjustmentService::new(state.db);
    let adjustments = service.list(current_user.0.tenant_id).await?;
    Ok(Json(adjustments))
}
