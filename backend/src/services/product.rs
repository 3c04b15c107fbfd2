//! Product service: recipes, cached costing, capacity and media slots

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::costing::{cost_breakdown, production_capacity, refresh_pricing, CostBreakdown, ProductionCapacity};
use shared::ledger::InventoryLedger;
use shared::stock::{check_availability, Availability};
use shared::types::MediaType;
use shared::validation::{
    validate_name, validate_non_negative, validate_positive_quantity, validate_preparation_time, validate_recipe,
};
use shared::{Product, ProductIngredient, ProductType};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{check, AppError, AppResult};
use crate::services::ingredient;

/// Product service for managing the menu and its recipes
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Row as stored in `products`
#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    name: String,
    product_type: String,
    ingredients: Json<Vec<ProductIngredient>>,
    cost_price: Decimal,
    selling_price: Option<Decimal>,
    profit_margin: Decimal,
    preparation_time: i32,
    tags: Vec<String>,
    is_active: bool,
    image_url: Option<String>,
    video_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            product_type: ProductType::from_str(&row.product_type).unwrap_or_default(),
            ingredients: row.ingredients.0,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            profit_margin: row.profit_margin,
            preparation_time: row.preparation_time,
            tags: row.tags,
            is_active: row.is_active,
            image_url: row.image_url,
            video_url: row.video_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, product_type, ingredients, cost_price, selling_price, \
     profit_margin, preparation_time, tags, is_active, image_url, video_url, created_at, updated_at";

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub ingredients: Vec<ProductIngredient>,
    /// Only used for direct-cost products
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub preparation_time: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: Option<bool>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub product_type: Option<ProductType>,
    pub ingredients: Option<Vec<ProductIngredient>>,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub preparation_time: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Capacity answer for a single product
#[derive(Debug, Clone, Serialize)]
pub struct ProductCapacityView {
    pub product_id: Uuid,
    pub product_name: String,
    /// True when nothing in stock limits production
    pub unconstrained: bool,
    pub capacity: Option<ProductionCapacity>,
}

/// Outcome of a bulk cost refresh
#[derive(Debug, Clone, Serialize)]
pub struct RecalculationSummary {
    pub products_checked: usize,
    pub products_updated: usize,
}

fn validate_product(product: &Product) -> AppResult<()> {
    check("name", validate_name(&product.name))?;
    check("ingredients", validate_recipe(product.product_type, &product.ingredients))?;
    check("cost_price", validate_non_negative(product.cost_price))?;
    if let Some(price) = product.selling_price {
        check("selling_price", validate_non_negative(price))?;
    }
    check("preparation_time", validate_preparation_time(product.preparation_time))?;
    Ok(())
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products ordered by name
    pub async fn list(&self, active_only: bool) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE ($1 = FALSE OR is_active) ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        let mut conn = self.db.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Create a product, computing its cached cost from current prices
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        let mut product = Product::new(input.name.trim(), input.product_type);
        product.ingredients = input.ingredients;
        product.cost_price = input.cost_price.unwrap_or(Decimal::ZERO);
        product.selling_price = input.selling_price;
        product.preparation_time = input.preparation_time;
        product.tags = input.tags;
        product.is_active = input.is_active.unwrap_or(true);
        validate_product(&product)?;

        let mut conn = self.db.acquire().await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        refresh_pricing(&mut product, &ingredients);
        insert(&mut conn, &product).await?;

        tracing::info!(
            product_id = %product.id,
            name = %product.name,
            product_type = %product.product_type.as_str(),
            cost_price = %product.cost_price,
            "Product created"
        );
        Ok(product)
    }

    /// Update a product and refresh its cached cost
    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;
        let mut product = fetch_for_update(&mut tx, id).await?;

        if let Some(name) = input.name {
            product.name = name.trim().to_string();
        }
        if let Some(product_type) = input.product_type {
            product.product_type = product_type;
            if product_type == ProductType::DirectCost && input.ingredients.is_none() {
                product.ingredients.clear();
            }
        }
        if let Some(lines) = input.ingredients {
            product.ingredients = lines;
        }
        if let Some(cost) = input.cost_price {
            product.cost_price = cost;
        }
        if input.selling_price.is_some() {
            product.selling_price = input.selling_price;
        }
        if let Some(minutes) = input.preparation_time {
            product.preparation_time = minutes;
        }
        if let Some(tags) = input.tags {
            product.tags = tags;
        }
        if let Some(active) = input.is_active {
            product.is_active = active;
        }
        validate_product(&product)?;

        let ingredients = ingredient::load_all(&mut tx).await?;
        refresh_pricing(&mut product, &ingredients);
        product.updated_at = Utc::now();
        save(&mut tx, &product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, cost_price = %product.cost_price, "Product updated");
        Ok(product)
    }

    /// Delete a product, returning it so its media can be cleaned up
    pub async fn delete(&self, id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        tracing::info!(product_id = %id, "Product deleted");
        Ok(Product::from(row))
    }

    /// Per-line cost at current ingredient prices
    pub async fn cost_breakdown(&self, id: Uuid) -> AppResult<CostBreakdown> {
        let mut conn = self.db.acquire().await?;
        let product = fetch(&mut conn, id).await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        Ok(cost_breakdown(&product, &ingredients))
    }

    /// How many units current stock can produce
    pub async fn capacity(&self, id: Uuid) -> AppResult<ProductCapacityView> {
        let mut conn = self.db.acquire().await?;
        let product = fetch(&mut conn, id).await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        let capacity = production_capacity(&product, &ingredients);

        Ok(ProductCapacityView {
            product_id: product.id,
            product_name: product.name,
            unconstrained: capacity.is_none(),
            capacity,
        })
    }

    /// Read-only check whether stock covers `quantity` units
    pub async fn check_availability(&self, id: Uuid, quantity: Decimal) -> AppResult<Availability> {
        check("quantity", validate_positive_quantity(quantity))?;
        let mut conn = self.db.acquire().await?;
        let product = fetch(&mut conn, id).await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        let availability = check_availability(&product, quantity, &ingredients);

        if !availability.sufficient {
            tracing::debug!(
                product_id = %id,
                %quantity,
                shortfalls = availability.shortfalls.len(),
                missing = availability.missing.len(),
                "Availability check found gaps"
            );
        }
        Ok(availability)
    }

    /// Refresh every product's cached cost and margin from current prices
    pub async fn recalculate_costs(&self) -> AppResult<RecalculationSummary> {
        let mut tx = self.db.begin().await?;
        let ingredients = ingredient::load_all(&mut tx).await?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY id FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let products_checked = rows.len();
        let mut ledger = InventoryLedger::from_records(ingredients, rows.into_iter().map(Product::from));
        let changed = ledger.refresh_product_costs();
        for id in &changed {
            if let Some(refreshed) = ledger.product(*id) {
                let mut product = refreshed.clone();
                product.updated_at = Utc::now();
                save(&mut tx, &product).await?;
            }
        }
        tx.commit().await?;
        let products_updated = changed.len();

        tracing::info!(products_checked, products_updated, "Product costs recalculated");
        Ok(RecalculationSummary {
            products_checked,
            products_updated,
        })
    }

    /// Point a media slot at a new URL (or clear it), returning the product and
    /// the URL it replaced
    pub async fn set_media(
        &self,
        id: Uuid,
        kind: MediaType,
        url: Option<String>,
    ) -> AppResult<(Product, Option<String>)> {
        let mut tx = self.db.begin().await?;
        let mut product = fetch_for_update(&mut tx, id).await?;
        let previous = std::mem::replace(product.media_url_mut(kind), url);
        product.updated_at = Utc::now();
        save(&mut tx, &product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, kind = kind.as_str(), "Product media slot updated");
        Ok((product, previous))
    }
}

// ============================================================================
// Row access
// ============================================================================

async fn fetch(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

async fn fetch_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(Product::from)
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Products with the given ids; unknown ids are absent
pub(crate) async fn load_many(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> AppResult<std::collections::HashMap<Uuid, Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products WHERE id = ANY($1)",
        PRODUCT_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let product = Product::from(row);
            (product.id, product)
        })
        .collect())
}

/// Every product, active or not
pub(crate) async fn load_all(conn: &mut PgConnection) -> AppResult<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

async fn insert(conn: &mut PgConnection, product: &Product) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, product_type, ingredients, cost_price, selling_price, profit_margin,
            preparation_time, tags, is_active, image_url, video_url, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.product_type.as_str())
    .bind(Json(&product.ingredients))
    .bind(product.cost_price)
    .bind(product.selling_price)
    .bind(product.profit_margin)
    .bind(product.preparation_time)
    .bind(&product.tags)
    .bind(product.is_active)
    .bind(&product.image_url)
    .bind(&product.video_url)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save(conn: &mut PgConnection, product: &Product) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET name = $2, product_type = $3, ingredients = $4, cost_price = $5, selling_price = $6,
            profit_margin = $7, preparation_time = $8, tags = $9, is_active = $10,
            image_url = $11, video_url = $12, updated_at = $13
        WHERE id = $1
        "#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.product_type.as_str())
    .bind(Json(&product.ingredients))
    .bind(product.cost_price)
    .bind(product.selling_price)
    .bind(product.profit_margin)
    .bind(product.preparation_time)
    .bind(&product.tags)
    .bind(product.is_active)
    .bind(&product.image_url)
    .bind(&product.video_url)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
