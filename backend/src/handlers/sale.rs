//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::stock::Availability;
use shared::Sale;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sale::{CreateSaleInput, OrderAvailabilityInput, SaleFilter, SaleReceiptView};
use crate::services::SaleService;
use crate::AppState;

/// List sales
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SaleService::new(state.db);
    let sales = service.list(&filter).await?;
    Ok(Json(sales))
}

/// Get a sale by ID
pub async fn get_sale(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Sale>> {
    let service = SaleService::new(state.db);
    let sale = service.get(id).await?;
    Ok(Json(sale))
}

/// Record a sale and decrement stock
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleReceiptView>)> {
    let enforce_by_default = state.config.sales.enforce_stock_by_default;
    let service = SaleService::new(state.db);
    let receipt = service.record(input, enforce_by_default).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Check whether stock covers a whole order without recording it
pub async fn check_order_availability(
    State(state): State<AppState>,
    Json(input): Json<OrderAvailabilityInput>,
) -> AppResult<Json<Availability>> {
    let service = SaleService::new(state.db);
    let availability = service.check_availability(input).await?;
    Ok(Json(availability))
}

/// Delete a sale record
pub async fn delete_sale(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    let service = SaleService::new(state.db);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
