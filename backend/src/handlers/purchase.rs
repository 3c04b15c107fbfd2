//! HTTP handlers for purchase endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::Purchase;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::purchase::{CreatePurchaseInput, PurchaseFilter, PurchaseReceipt};
use crate::services::PurchaseService;
use crate::AppState;

/// List purchases
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> AppResult<Json<Vec<Purchase>>> {
    let service = PurchaseService::new(state.db);
    let purchases = service.list(&filter).await?;
    Ok(Json(purchases))
}

/// Record a purchase and raise the ingredient's stock
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseReceipt>)> {
    input.validate()?;
    let service = PurchaseService::new(state.db);
    let receipt = service.record(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Delete a purchase record
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.db);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
