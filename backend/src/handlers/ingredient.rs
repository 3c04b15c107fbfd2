//! HTTP handlers for ingredient endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::ingredient::{CreateIngredientInput, IngredientView, UpdateIngredientInput};
use crate::services::IngredientService;
use crate::AppState;

/// List all ingredients
pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<IngredientView>>> {
    let service = IngredientService::new(state.db);
    let ingredients = service.list().await?;
    Ok(Json(ingredients.into_iter().map(IngredientView::from).collect()))
}

/// Get an ingredient by ID
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IngredientView>> {
    let service = IngredientService::new(state.db);
    let ingredient = service.get(id).await?;
    Ok(Json(ingredient.into()))
}

/// Create an ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<IngredientView>)> {
    input.validate()?;
    let service = IngredientService::new(state.db);
    let ingredient = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(ingredient.into())))
}

/// Update an ingredient
pub async fn update_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateIngredientInput>,
) -> AppResult<Json<IngredientView>> {
    input.validate()?;
    let service = IngredientService::new(state.db);
    let ingredient = service.update(id, input).await?;
    Ok(Json(ingredient.into()))
}

/// Delete an ingredient
pub async fn delete_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = IngredientService::new(state.db);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
