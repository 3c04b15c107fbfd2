//! HTTP handlers for product endpoints, including media upload

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::costing::CostBreakdown;
use shared::stock::Availability;
use shared::types::MediaType;
use shared::Product;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::storage::file_extension;
use crate::external::MediaStorage;
use crate::services::product::{
    CreateProductInput, ProductCapacityView, RecalculationSummary, UpdateProductInput,
};
use crate::services::ProductService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub kind: String,
}

fn parse_media_kind(kind: &str) -> AppResult<MediaType> {
    MediaType::from_str(kind).ok_or_else(|| AppError::validation("kind", "kind must be 'image' or 'video'"))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list(query.active_only).await?;
    Ok(Json(products))
}

/// Get a product by ID
pub async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get(id).await?;
    Ok(Json(product))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    input.validate()?;
    let service = ProductService::new(state.db);
    let product = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    input.validate()?;
    let service = ProductService::new(state.db);
    let product = service.update(id, input).await?;
    Ok(Json(product))
}

/// Delete a product and its stored media
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    let service = ProductService::new(state.db);
    let product = service.delete(id).await?;

    for url in [product.image_url, product.video_url].into_iter().flatten() {
        discard_media(&state.storage, &url).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Per-line cost breakdown
pub async fn get_cost_breakdown(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CostBreakdown>> {
    let service = ProductService::new(state.db);
    let breakdown = service.cost_breakdown(id).await?;
    Ok(Json(breakdown))
}

/// Units producible from current stock
pub async fn get_capacity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductCapacityView>> {
    let service = ProductService::new(state.db);
    let capacity = service.capacity(id).await?;
    Ok(Json(capacity))
}

/// Advisory stock check for a quantity of one product
pub async fn check_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AvailabilityRequest>,
) -> AppResult<Json<Availability>> {
    let service = ProductService::new(state.db);
    let availability = service.check_availability(id, request.quantity).await?;
    Ok(Json(availability))
}

/// Refresh every product's cached cost
pub async fn recalculate_costs(State(state): State<AppState>) -> AppResult<Json<RecalculationSummary>> {
    let service = ProductService::new(state.db);
    let summary = service.recalculate_costs().await?;
    Ok(Json(summary))
}

/// Upload an image or video for a product (multipart field `file`)
pub async fn upload_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MediaQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<Product>> {
    let kind = parse_media_kind(&query.kind)?;
    let service = ProductService::new(state.db.clone());
    // Fail before uploading anything if the product is gone
    service.get(id).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("file", format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation("file", format!("Read error: {}", e)))?;
            file = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = file.ok_or_else(|| AppError::validation("file", "No file provided"))?;
    if data.is_empty() {
        return Err(AppError::validation("file", "Empty file"));
    }
    if data.len() > state.storage.max_upload_bytes() {
        return Err(AppError::validation(
            "file",
            format!("File too large: {} bytes (max {})", data.len(), state.storage.max_upload_bytes()),
        ));
    }

    let extension = file_extension(&filename).unwrap_or_default();
    if !kind.allowed_extensions().contains(&extension.as_str()) {
        return Err(AppError::validation(
            "file",
            format!(
                "Unsupported {} format: '{}'. Supported: {}",
                kind.as_str(),
                extension,
                kind.allowed_extensions().join(", ")
            ),
        ));
    }

    let stored = state.storage.put(id, kind, &filename, data).await?;
    let (product, previous) = service.set_media(id, kind, Some(stored.url.clone())).await?;

    if let Some(old) = previous.filter(|old| *old != stored.url) {
        discard_media(&state.storage, &old).await;
    }
    Ok(Json(product))
}

/// Clear a product's image or video and delete the stored object
pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MediaQuery>,
) -> AppResult<Json<Product>> {
    let kind = parse_media_kind(&query.kind)?;
    let service = ProductService::new(state.db);
    let (product, previous) = service.set_media(id, kind, None).await?;

    if let Some(url) = previous {
        discard_media(&state.storage, &url).await;
    }
    Ok(Json(product))
}

/// Delete an orphaned object; the database is already consistent, so failures are only logged
async fn discard_media(storage: &MediaStorage, url: &str) {
    if let Err(e) = storage.delete_by_url(url).await {
        tracing::warn!(url = %url, error = %e, "Failed to delete orphaned product media");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    /// Storage whose endpoint refuses every connection
    fn unreachable_storage() -> MediaStorage {
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();
        let config = StorageConfig {
            region: "us-east-1".to_string(),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.example.com".to_string(),
            max_upload_bytes: 1024,
        };
        MediaStorage::from_client(aws_sdk_s3::Client::from_conf(s3_config), config)
    }

    #[tokio::test]
    async fn test_discard_media_swallows_storage_failure() {
        let storage = unreachable_storage();
        let url = "https://cdn.example.com/products/0/abc.png";

        assert!(matches!(storage.delete_by_url(url).await, Err(AppError::Storage(_))));
        // Clearing a media slot must not fail once the database change is committed
        discard_media(&storage, url).await;
    }

    #[test]
    fn test_parse_media_kind() {
        assert!(matches!(parse_media_kind("image"), Ok(MediaType::Image)));
        assert!(parse_media_kind("audio").is_err());
    }
}
