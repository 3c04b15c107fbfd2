//! Reporting service for analytics and data export
//! Provides low-stock, production capacity and sales summary reports

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::InventoryLedger;
use shared::LowStockItem;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{ingredient, product};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Capacity report entry, flat so it exports cleanly to CSV
#[derive(Debug, Serialize)]
pub struct CapacityReportRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub max_units: u64,
    pub limiting_ingredient_id: Option<Uuid>,
    pub limiting_ingredient_name: Option<String>,
    pub potential_revenue: Decimal,
    pub potential_profit: Decimal,
}

/// Sales totals for one day
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySalesRow {
    pub day: NaiveDate,
    pub sale_count: i64,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub cost_total: Decimal,
    pub profit_total: Decimal,
}

/// Quantity and revenue per product over the period
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductSalesRow {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub revenue: Decimal,
    pub cost: Decimal,
}

/// Sales summary for a period
#[derive(Debug, Serialize)]
pub struct SalesSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sale_count: i64,
    pub total: Decimal,
    pub cost_total: Decimal,
    pub profit_total: Decimal,
    pub daily: Vec<DailySalesRow>,
    pub products: Vec<ProductSalesRow>,
}

/// Report filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Ingredients at or below their minimum stock, sorted by name
    pub async fn low_stock_report(&self) -> AppResult<Vec<LowStockItem>> {
        let mut conn = self.db.acquire().await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        Ok(InventoryLedger::from_records(ingredients, Vec::new()).low_stock())
    }

    /// Production capacity for every active product that draws on stock,
    /// tightest first
    pub async fn capacity_report(&self) -> AppResult<Vec<CapacityReportRow>> {
        let mut conn = self.db.acquire().await?;
        let ingredients = ingredient::load_all(&mut conn).await?;
        let products = product::load_all(&mut conn).await?;
        let ledger = InventoryLedger::from_records(ingredients, products);

        let rows: Vec<CapacityReportRow> = ledger
            .capacity_report()
            .into_iter()
            .map(|(p, capacity)| {
                let limiting = capacity.limiting_ingredient;
                CapacityReportRow {
                    product_id: p.id,
                    product_name: p.name.clone(),
                    max_units: capacity.max_units,
                    limiting_ingredient_id: limiting.as_ref().map(|l| l.ingredient_id),
                    limiting_ingredient_name: limiting.and_then(|l| l.name),
                    potential_revenue: capacity.potential_revenue,
                    potential_profit: capacity.potential_profit,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Sales per day and per product over an optional date range
    pub async fn sales_summary(&self, filter: &ReportFilter) -> AppResult<SalesSummary> {
        let daily = sqlx::query_as::<_, DailySalesRow>(
            r#"
            SELECT
                sold_at::DATE as day,
                COUNT(*) as sale_count,
                COALESCE(SUM(subtotal), 0) as subtotal,
                COALESCE(SUM(discount), 0) as discount,
                COALESCE(SUM(total - (subtotal - discount)), 0) as tax,
                COALESCE(SUM(total), 0) as total,
                COALESCE(SUM(cost_total), 0) as cost_total,
                COALESCE(SUM(profit_total), 0) as profit_total
            FROM sales
            WHERE ($1::DATE IS NULL OR sold_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sold_at::DATE <= $2)
            GROUP BY sold_at::DATE
            ORDER BY day
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        let products = sqlx::query_as::<_, ProductSalesRow>(
            r#"
            SELECT
                (item->>'product_id')::UUID as product_id,
                item->>'name' as name,
                SUM((item->>'quantity')::NUMERIC) as quantity,
                SUM((item->>'quantity')::NUMERIC * (item->>'sale_price')::NUMERIC) as revenue,
                SUM((item->>'quantity')::NUMERIC * (item->>'cost_price')::NUMERIC) as cost
            FROM sales, jsonb_array_elements(items) as item
            WHERE ($1::DATE IS NULL OR sold_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sold_at::DATE <= $2)
            GROUP BY 1, 2
            ORDER BY revenue DESC
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(SalesSummary {
            start_date: filter.start_date,
            end_date: filter.end_date,
            sale_count: daily.iter().map(|d| d.sale_count).sum(),
            total: daily.iter().map(|d| d.total).sum(),
            cost_total: daily.iter().map(|d| d.cost_total).sum(),
            profit_total: daily.iter().map(|d| d.profit_total).sum(),
            daily,
            products,
        })
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Unit;

    #[test]
    fn test_export_low_stock_to_csv() {
        let rows = vec![LowStockItem {
            ingredient_id: Uuid::nil(),
            name: "Basil".to_string(),
            category: "Herbs".to_string(),
            unit: Unit::Gram,
            current_stock: Decimal::from(40),
            minimum_stock: Decimal::from(100),
            deficit: Decimal::from(60),
        }];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ingredient_id,name,category,unit,current_stock,minimum_stock,deficit")
        );
        assert_eq!(
            lines.next(),
            Some("00000000-0000-0000-0000-000000000000,Basil,Herbs,g,40,100,60")
        );
    }

    #[test]
    fn test_export_capacity_with_empty_optionals() {
        let rows = vec![CapacityReportRow {
            product_id: Uuid::nil(),
            product_name: "Margherita".to_string(),
            max_units: 7,
            limiting_ingredient_id: None,
            limiting_ingredient_name: None,
            potential_revenue: Decimal::ZERO,
            potential_profit: Decimal::ZERO,
        }];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        assert!(csv.lines().nth(1).unwrap().contains("Margherita,7,,,0,0"));
    }

    #[test]
    fn test_export_empty() {
        let rows: Vec<DailySalesRow> = vec![];
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }
}
