//! Product and recipe models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::unit::Unit;
use crate::types::MediaType;

/// How a product's cost is determined
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Cost is the sum of recipe line costs
    #[default]
    IngredientBased,
    /// Cost is a manually entered price, no recipe
    DirectCost,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::IngredientBased => "ingredient_based",
            ProductType::DirectCost => "direct_cost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ingredient_based" => Some(ProductType::IngredientBased),
            "direct_cost" => Some(ProductType::DirectCost),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::IngredientBased => write!(f, "Ingredient Based"),
            ProductType::DirectCost => write!(f, "Direct Cost"),
        }
    }
}

/// A recipe line; `unit` may differ from the ingredient's stocked unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductIngredient {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
}

impl ProductIngredient {
    pub fn new(ingredient_id: Uuid, quantity: Decimal, unit: Unit) -> Self {
        Self {
            ingredient_id,
            quantity,
            unit,
        }
    }
}

/// A sellable menu product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub product_type: ProductType,
    /// Empty for direct-cost products
    pub ingredients: Vec<ProductIngredient>,
    /// Cached; recompute with `costing::refresh_pricing` after price changes
    pub cost_price: Decimal,
    pub selling_price: Option<Decimal>,
    /// Cached percentage derived from cost and selling price
    pub profit_margin: Decimal,
    /// Minutes
    pub preparation_time: i32,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, product_type: ProductType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            product_type,
            ingredients: Vec::new(),
            cost_price: Decimal::ZERO,
            selling_price: None,
            profit_margin: Decimal::ZERO,
            preparation_time: 0,
            tags: Vec::new(),
            is_active: true,
            image_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_line(mut self, ingredient_id: Uuid, quantity: Decimal, unit: Unit) -> Self {
        self.ingredients
            .push(ProductIngredient::new(ingredient_id, quantity, unit));
        self
    }

    pub fn with_cost_price(mut self, cost_price: Decimal) -> Self {
        self.cost_price = cost_price;
        self
    }

    pub fn with_selling_price(mut self, selling_price: Decimal) -> Self {
        self.selling_price = Some(selling_price);
        self
    }

    pub fn is_ingredient_based(&self) -> bool {
        self.product_type == ProductType::IngredientBased
    }

    /// True when the product draws down ingredient stock when sold
    pub fn consumes_stock(&self) -> bool {
        self.is_ingredient_based() && !self.ingredients.is_empty()
    }

    /// The URL slot holding this kind of media
    pub fn media_url_mut(&mut self, kind: MediaType) -> &mut Option<String> {
        match kind {
            MediaType::Image => &mut self.image_url,
            MediaType::Video => &mut self.video_url,
        }
    }
}
