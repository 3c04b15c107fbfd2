//! Sale service: order entry and the stock decrement it causes

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::InventoryLedger;
use shared::stock::{check_order_availability, Availability};
use shared::validation::{validate_discount, validate_non_negative, validate_positive_quantity, validate_tax_rate};
use shared::{Ingredient, NewSale, Product, Sale, SaleItem, SaleLineInput, TaxLine};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{check, AppError, AppResult};
use crate::services::{ingredient, product};

/// Sale service for recording orders
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    items: Json<Vec<SaleItem>>,
    subtotal: Decimal,
    discount: Decimal,
    taxes: Json<Vec<TaxLine>>,
    total: Decimal,
    cost_total: Decimal,
    profit_total: Decimal,
    payment_method: Option<String>,
    notes: Option<String>,
    sold_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            items: row.items.0,
            subtotal: row.subtotal,
            discount: row.discount,
            taxes: row.taxes.0,
            total: row.total,
            cost_total: row.cost_total,
            profit_total: row.profit_total,
            payment_method: row.payment_method,
            notes: row.notes,
            sold_at: row.sold_at,
        }
    }
}

const SALE_COLUMNS: &str =
    "id, items, subtotal, discount, taxes, total, cost_total, profit_total, payment_method, notes, sold_at";

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    #[serde(flatten)]
    pub sale: NewSale,
    /// Reject the sale on any shortfall; defaults to `sales.enforce_stock_by_default`
    pub enforce_stock: Option<bool>,
}

/// Input for an order-level availability check
#[derive(Debug, Deserialize)]
pub struct OrderAvailabilityInput {
    pub items: Vec<SaleLineInput>,
}

/// Query filter for the sale list
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A recorded sale with its stock side effects
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceiptView {
    pub sale: Sale,
    /// Stock check taken before the decrement
    pub availability: Availability,
    pub updated_ingredients: Vec<Ingredient>,
}

fn validate_sale(sale: &NewSale) -> AppResult<()> {
    for line in &sale.items {
        check("items.quantity", validate_positive_quantity(line.quantity))?;
        if let Some(price) = line.sale_price {
            check("items.sale_price", validate_non_negative(price))?;
        }
    }
    check("discount", validate_discount(&sale.discount))?;
    for rate in &sale.tax_rates {
        check("tax_rates", validate_tax_rate(rate.rate_percent))?;
    }
    Ok(())
}

/// Distinct product ids an order references, in order of first appearance
fn product_ids(lines: &[SaleLineInput]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .map(|line| line.product_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Distinct ingredient ids the given recipes draw on
fn recipe_ingredient_ids<'a>(products: impl Iterator<Item = &'a Product>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = products
        .filter(|p| p.consumes_stock())
        .flat_map(|p| p.ingredients.iter().map(|line| line.ingredient_id))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List sales, newest first
    pub async fn list(&self, filter: &SaleFilter) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {}
            FROM sales
            WHERE ($1::DATE IS NULL OR sold_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sold_at::DATE <= $2)
            ORDER BY sold_at DESC
            "#,
            SALE_COLUMNS
        ))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Get a sale by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Sale> {
        sqlx::query_as::<_, SaleRow>(&format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Sale::from)
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))
    }

    /// Record a sale.
    ///
    /// Every ingredient the order draws on is locked, decremented (clamped at
    /// zero) and written back together with the sale row in one transaction.
    /// A shortfall only rejects the sale when stock enforcement is on.
    pub async fn record(&self, input: CreateSaleInput, enforce_by_default: bool) -> AppResult<SaleReceiptView> {
        validate_sale(&input.sale)?;
        let enforce_stock = input.enforce_stock.unwrap_or(enforce_by_default);

        let mut tx = self.db.begin().await?;
        let products = product::load_many(&mut tx, &product_ids(&input.sale.items)).await?;
        let ingredient_ids = recipe_ingredient_ids(products.values());
        let locked = ingredient::lock_for_update(&mut tx, &ingredient_ids).await?;

        let mut ledger = InventoryLedger::new();
        for item in locked.into_values() {
            ledger.upsert_ingredient(item);
        }
        for item in products.into_values() {
            ledger.upsert_product(item);
        }

        let receipt = ledger.record_sale(input.sale, enforce_stock)?;
        if !receipt.availability.sufficient {
            tracing::warn!(
                sale_id = %receipt.sale.id,
                shortfalls = receipt.availability.shortfalls.len(),
                missing = receipt.availability.missing.len(),
                "Sale recorded with insufficient stock; affected stock clamped at zero"
            );
        }

        for updated in &receipt.updated_ingredients {
            ingredient::write_stock(&mut tx, updated).await?;
        }
        insert(&mut tx, &receipt.sale).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %receipt.sale.id,
            items = receipt.sale.items.len(),
            total = %receipt.sale.total,
            ingredients_updated = receipt.updated_ingredients.len(),
            "Sale recorded"
        );

        Ok(SaleReceiptView {
            sale: receipt.sale,
            availability: receipt.availability,
            updated_ingredients: receipt.updated_ingredients,
        })
    }

    /// Read-only availability check for a whole order
    pub async fn check_availability(&self, input: OrderAvailabilityInput) -> AppResult<Availability> {
        for line in &input.items {
            check("items.quantity", validate_positive_quantity(line.quantity))?;
        }

        let mut conn = self.db.acquire().await?;
        let products = product::load_many(&mut conn, &product_ids(&input.items)).await?;
        let ingredients = ingredient::load_all(&mut conn).await?;

        let mut lines: Vec<(&Product, Decimal)> = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;
            lines.push((product, line.quantity));
        }

        Ok(check_order_availability(&lines, &ingredients))
    }

    /// Delete a sale record. The stock it consumed is not restored.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Sale".to_string()));
        }

        tracing::info!(sale_id = %id, "Sale deleted, stock left unchanged");
        Ok(())
    }
}

async fn insert(conn: &mut PgConnection, sale: &Sale) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, items, subtotal, discount, taxes, total, cost_total, profit_total,
            payment_method, notes, sold_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(sale.id)
    .bind(Json(&sale.items))
    .bind(sale.subtotal)
    .bind(sale.discount)
    .bind(Json(&sale.taxes))
    .bind(sale.total)
    .bind(sale.cost_total)
    .bind(sale.profit_total)
    .bind(&sale.payment_method)
    .bind(&sale.notes)
    .bind(sale.sold_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ProductType, Unit};

    fn line(product_id: Uuid) -> SaleLineInput {
        SaleLineInput {
            product_id,
            quantity: Decimal::ONE,
            sale_price: None,
        }
    }

    #[test]
    fn test_product_ids_are_distinct_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(product_ids(&[line(a), line(b), line(a)]), vec![a, b]);
    }

    #[test]
    fn test_recipe_ingredient_ids_skip_direct_cost() {
        let shared_id = Uuid::new_v4();
        let soup = Product::new("Soup", ProductType::IngredientBased)
            .with_line(shared_id, Decimal::from(200), Unit::Milliliter);
        let bread = Product::new("Bread", ProductType::IngredientBased)
            .with_line(shared_id, Decimal::from(50), Unit::Gram);
        let soda = Product::new("Soda", ProductType::DirectCost);

        let ids = recipe_ingredient_ids([&soup, &bread, &soda].into_iter());
        assert_eq!(ids, vec![shared_id]);
    }

    #[test]
    fn test_validate_sale_rejects_bad_discount() {
        let sale = NewSale {
            items: vec![line(Uuid::new_v4())],
            discount: shared::Discount::Percent(Decimal::from(120)),
            ..Default::default()
        };
        assert!(validate_sale(&sale).is_err());
    }

    #[test]
    fn test_validate_sale_rejects_negative_price_override() {
        let mut override_line = line(Uuid::new_v4());
        override_line.sale_price = Some(Decimal::from(-5));
        let sale = NewSale {
            items: vec![override_line],
            ..Default::default()
        };

        match validate_sale(&sale) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "items.sale_price"),
            other => panic!("expected validation error, got {:?}", other),
        }

        let mut free_line = line(Uuid::new_v4());
        free_line.sale_price = Some(Decimal::ZERO);
        let sale = NewSale {
            items: vec![free_line],
            ..Default::default()
        };
        assert!(validate_sale(&sale).is_ok());
    }
}
