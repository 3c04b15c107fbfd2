//! Ingredient inventory models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::unit::{to_base, Unit};

/// A stocked ingredient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Cost per kilogram-equivalent, whatever `unit` stock is tracked in
    pub price_per_kg: Decimal,
    /// Unit `current_stock` and `minimum_stock` are expressed in
    pub unit: Unit,
    pub category: String,
    pub minimum_stock: Decimal,
    pub current_stock: Decimal,
    /// Bumped on every write; used to reject stale edits
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, unit: Unit, price_per_kg: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price_per_kg,
            unit,
            category: String::new(),
            minimum_stock: Decimal::ZERO,
            current_stock: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_stock(mut self, current_stock: Decimal) -> Self {
        self.current_stock = current_stock.max(Decimal::ZERO);
        self
    }

    pub fn with_minimum_stock(mut self, minimum_stock: Decimal) -> Self {
        self.minimum_stock = minimum_stock;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Stock in grams (or item count), derived from `current_stock` on read
    pub fn stock_grams(&self) -> Decimal {
        to_base(self.current_stock, &self.unit)
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }
}

/// Low-stock entry for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockItem {
    pub ingredient_id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: Unit,
    pub current_stock: Decimal,
    pub minimum_stock: Decimal,
    pub deficit: Decimal,
}

impl From<&Ingredient> for LowStockItem {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            ingredient_id: ingredient.id,
            name: ingredient.name.clone(),
            category: ingredient.category.clone(),
            unit: ingredient.unit.clone(),
            current_stock: ingredient.current_stock,
            minimum_stock: ingredient.minimum_stock,
            deficit: ingredient.minimum_stock.saturating_sub(ingredient.current_stock).max(Decimal::ZERO),
        }
    }
}
