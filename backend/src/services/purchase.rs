//! Purchase service: the append-only purchase ledger and the stock it adds

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::InventoryLedger;
use shared::validation::{validate_non_negative, validate_positive_quantity};
use shared::{Ingredient, NewPurchase, Purchase, Unit};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{check, AppError, AppResult};
use crate::services::ingredient;

/// Purchase service for recording stock deliveries
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: Uuid,
    ingredient_id: Uuid,
    quantity: Decimal,
    unit: String,
    price_per_kg: Decimal,
    total_cost: Decimal,
    supplier: String,
    purchase_date: NaiveDate,
    delivery_date: Option<NaiveDate>,
    invoice_number: Option<String>,
    notes: Option<String>,
    quantity_grams: Decimal,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Purchase {
            id: row.id,
            ingredient_id: row.ingredient_id,
            quantity: row.quantity,
            unit: Unit::from(row.unit),
            price_per_kg: row.price_per_kg,
            total_cost: row.total_cost,
            supplier: row.supplier,
            purchase_date: row.purchase_date,
            delivery_date: row.delivery_date,
            invoice_number: row.invoice_number,
            notes: row.notes,
            quantity_grams: row.quantity_grams,
            created_at: row.created_at,
        }
    }
}

const PURCHASE_COLUMNS: &str = "id, ingredient_id, quantity, unit, price_per_kg, total_cost, supplier, \
     purchase_date, delivery_date, invoice_number, notes, quantity_grams, created_at";

/// Input for recording a purchase
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    /// New price per kilogram-equivalent; becomes the ingredient's price
    pub price_per_kg: Decimal,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

/// Query filter for the purchase list
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub ingredient_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A recorded purchase with the ingredient as it stands afterwards
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub ingredient: Ingredient,
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List purchases, newest first
    pub async fn list(&self, filter: &PurchaseFilter) -> AppResult<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            SELECT {}
            FROM purchases
            WHERE ($1::UUID IS NULL OR ingredient_id = $1)
              AND ($2::DATE IS NULL OR purchase_date >= $2)
              AND ($3::DATE IS NULL OR purchase_date <= $3)
            ORDER BY purchase_date DESC, created_at DESC
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(filter.ingredient_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    /// Record a purchase.
    ///
    /// The ingredient row is locked, its stock raised and its price replaced,
    /// and the ledger entry inserted, all in one transaction.
    pub async fn record(&self, input: CreatePurchaseInput) -> AppResult<PurchaseReceipt> {
        check("quantity", validate_positive_quantity(input.quantity))?;
        check("price_per_kg", validate_non_negative(input.price_per_kg))?;

        let new_purchase = NewPurchase {
            ingredient_id: input.ingredient_id,
            quantity: input.quantity,
            unit: input.unit,
            price_per_kg: input.price_per_kg,
            supplier: input.supplier.unwrap_or_default(),
            purchase_date: input.purchase_date.unwrap_or_else(|| Utc::now().date_naive()),
            delivery_date: input.delivery_date,
            invoice_number: input.invoice_number,
            notes: input.notes,
        };

        let mut tx = self.db.begin().await?;
        let locked = ingredient::lock_for_update(&mut tx, &[input.ingredient_id]).await?;

        let mut ledger = InventoryLedger::new();
        for item in locked.into_values() {
            ledger.upsert_ingredient(item);
        }
        let purchase = ledger.record_purchase(new_purchase)?;
        let updated = ledger
            .ingredient(purchase.ingredient_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Purchased ingredient missing from ledger".to_string()))?;

        ingredient::write_stock(&mut tx, &updated).await?;
        insert(&mut tx, &purchase).await?;
        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase.id,
            ingredient_id = %updated.id,
            quantity = %purchase.quantity,
            unit = %purchase.unit,
            total_cost = %purchase.total_cost,
            new_stock = %updated.current_stock,
            "Purchase recorded"
        );

        Ok(PurchaseReceipt {
            purchase,
            ingredient: updated,
        })
    }

    /// Delete a purchase record. The stock it added is not taken back.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase".to_string()));
        }

        tracing::info!(purchase_id = %id, "Purchase deleted, stock left unchanged");
        Ok(())
    }
}

async fn insert(conn: &mut PgConnection, purchase: &Purchase) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchases (
            id, ingredient_id, quantity, unit, price_per_kg, total_cost, supplier,
            purchase_date, delivery_date, invoice_number, notes, quantity_grams, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(purchase.id)
    .bind(purchase.ingredient_id)
    .bind(purchase.quantity)
    .bind(purchase.unit.as_str())
    .bind(purchase.price_per_kg)
    .bind(purchase.total_cost)
    .bind(&purchase.supplier)
    .bind(purchase.purchase_date)
    .bind(purchase.delivery_date)
    .bind(&purchase.invoice_number)
    .bind(&purchase.notes)
    .bind(purchase.quantity_grams)
    .bind(purchase.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
