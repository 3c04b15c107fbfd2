//! Ingredient service: CRUD plus the locked stock writes used by purchases and sales

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::{validate_name, validate_non_negative};
use shared::{Ingredient, Unit};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{check, AppError, AppResult};

/// Ingredient service for managing the stock catalogue
#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

/// Row as stored in `ingredients`
#[derive(Debug, FromRow)]
pub(crate) struct IngredientRow {
    id: Uuid,
    name: String,
    price_per_kg: Decimal,
    unit: String,
    category: String,
    minimum_stock: Decimal,
    current_stock: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Ingredient {
            id: row.id,
            name: row.name,
            price_per_kg: row.price_per_kg,
            unit: Unit::from(row.unit),
            category: row.category,
            minimum_stock: row.minimum_stock,
            current_stock: row.current_stock,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INGREDIENT_COLUMNS: &str = "id, name, price_per_kg, unit, category, minimum_stock, \
     current_stock, version, created_at, updated_at";

/// Ingredient as returned over HTTP, with the derived gram figure
#[derive(Debug, Clone, Serialize)]
pub struct IngredientView {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub stock_grams: Decimal,
    pub is_low_stock: bool,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            stock_grams: ingredient.stock_grams(),
            is_low_stock: ingredient.is_low_stock(),
            ingredient,
        }
    }
}

/// Input for creating an ingredient
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIngredientInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub price_per_kg: Decimal,
    #[serde(default)]
    pub unit: Unit,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub minimum_stock: Option<Decimal>,
    pub current_stock: Option<Decimal>,
}

/// Input for updating an ingredient.
///
/// When `expected_version` is set the update only applies to that version.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateIngredientInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub price_per_kg: Option<Decimal>,
    pub unit: Option<Unit>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub minimum_stock: Option<Decimal>,
    pub current_stock: Option<Decimal>,
    pub expected_version: Option<i64>,
}

fn validate_amounts(ingredient: &Ingredient) -> AppResult<()> {
    check("name", validate_name(&ingredient.name))?;
    check("price_per_kg", validate_non_negative(ingredient.price_per_kg))?;
    check("minimum_stock", validate_non_negative(ingredient.minimum_stock))?;
    check("current_stock", validate_non_negative(ingredient.current_stock))?;
    Ok(())
}

impl IngredientService {
    /// Create a new IngredientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all ingredients ordered by name
    pub async fn list(&self) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients ORDER BY name",
            INGREDIENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    /// Get an ingredient by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Ingredient> {
        sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Ingredient::from)
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Create an ingredient
    pub async fn create(&self, input: CreateIngredientInput) -> AppResult<Ingredient> {
        let mut ingredient = Ingredient::new(input.name.trim(), input.unit, input.price_per_kg)
            .with_category(input.category.unwrap_or_default())
            .with_minimum_stock(input.minimum_stock.unwrap_or(Decimal::ZERO));
        ingredient.current_stock = input.current_stock.unwrap_or(Decimal::ZERO);
        validate_amounts(&ingredient)?;

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, name, price_per_kg, unit, category, minimum_stock, current_stock,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(ingredient.id)
        .bind(&ingredient.name)
        .bind(ingredient.price_per_kg)
        .bind(ingredient.unit.as_str())
        .bind(&ingredient.category)
        .bind(ingredient.minimum_stock)
        .bind(ingredient.current_stock)
        .bind(ingredient.version)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(ingredient_id = %ingredient.id, name = %ingredient.name, unit = %ingredient.unit, "Ingredient created");
        Ok(ingredient)
    }

    /// Update an ingredient, rejecting stale versions
    pub async fn update(&self, id: Uuid, input: UpdateIngredientInput) -> AppResult<Ingredient> {
        let current = self.get(id).await?;
        let expected_version = input.expected_version.unwrap_or(current.version);
        if expected_version != current.version {
            return Err(stale_version(id, expected_version, current.version));
        }

        let mut ingredient = current;
        if let Some(name) = input.name {
            ingredient.name = name.trim().to_string();
        }
        if let Some(price) = input.price_per_kg {
            ingredient.price_per_kg = price;
        }
        if let Some(unit) = input.unit {
            ingredient.unit = unit;
        }
        if let Some(category) = input.category {
            ingredient.category = category;
        }
        if let Some(minimum) = input.minimum_stock {
            ingredient.minimum_stock = minimum;
        }
        if let Some(stock) = input.current_stock {
            ingredient.current_stock = stock;
        }
        validate_amounts(&ingredient)?;
        ingredient.version = expected_version + 1;
        ingredient.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE ingredients
            SET name = $3, price_per_kg = $4, unit = $5, category = $6,
                minimum_stock = $7, current_stock = $8, version = $9, updated_at = $10
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(&ingredient.name)
        .bind(ingredient.price_per_kg)
        .bind(ingredient.unit.as_str())
        .bind(&ingredient.category)
        .bind(ingredient.minimum_stock)
        .bind(ingredient.current_stock)
        .bind(ingredient.version)
        .bind(ingredient.updated_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(stale_version(id, expected_version, expected_version + 1));
        }

        tracing::info!(ingredient_id = %id, version = ingredient.version, "Ingredient updated");
        Ok(ingredient)
    }

    /// Delete an ingredient. Recipe lines pointing at it are left in place.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        tracing::info!(ingredient_id = %id, "Ingredient deleted");
        Ok(())
    }
}

fn stale_version(id: Uuid, expected: i64, found: i64) -> AppError {
    tracing::warn!(ingredient_id = %id, expected, found, "Stale ingredient update rejected");
    AppError::Conflict {
        resource: "ingredient".to_string(),
        message: format!(
            "Ingredient was modified concurrently (expected version {}, found {})",
            expected, found
        ),
    }
}

// ============================================================================
// Helpers shared with purchases, products and sales
// ============================================================================

/// Every ingredient keyed by id
pub(crate) async fn load_all(conn: &mut PgConnection) -> AppResult<HashMap<Uuid, Ingredient>> {
    let rows = sqlx::query_as::<_, IngredientRow>(&format!(
        "SELECT {} FROM ingredients",
        INGREDIENT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let ingredient = Ingredient::from(row);
            (ingredient.id, ingredient)
        })
        .collect())
}

/// Lock the given ingredient rows for the rest of the transaction.
///
/// Rows are locked in id order so concurrent writers cannot deadlock.
/// Ids that no longer exist are simply absent from the result.
pub(crate) async fn lock_for_update(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Ingredient>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, IngredientRow>(&format!(
        "SELECT {} FROM ingredients WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        INGREDIENT_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let ingredient = Ingredient::from(row);
            (ingredient.id, ingredient)
        })
        .collect())
}

/// Persist stock and price produced by a stock mutation.
///
/// The row must still be at `version - 1`; anything else aborts the caller's
/// transaction with an error naming the ingredient.
pub(crate) async fn write_stock(conn: &mut PgConnection, ingredient: &Ingredient) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE ingredients
        SET current_stock = $2, price_per_kg = $3, version = $4, updated_at = $5
        WHERE id = $1 AND version = $4 - 1
        "#,
    )
    .bind(ingredient.id)
    .bind(ingredient.current_stock)
    .bind(ingredient.price_per_kg)
    .bind(ingredient.version)
    .bind(ingredient.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::StockWriteFailed {
        ingredient_id: ingredient.id,
        message: e.to_string(),
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::StockWriteFailed {
            ingredient_id: ingredient.id,
            message: "ingredient row changed or vanished during the update".to_string(),
        });
    }
    Ok(())
}
