//! In-memory inventory ledger
//!
//! Mirrors what the backend persists: ingredients and products keyed by id,
//! append-only purchases and sales. Used as the client-side cache and as the
//! reference model in tests.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::costing::{production_capacity, refresh_pricing, ProductionCapacity};
use crate::error::LedgerError;
use crate::models::{
    compute_sale_totals, price_sale_lines, Ingredient, LowStockItem, NewPurchase, NewSale, Product, Purchase, Sale,
};
use crate::stock::{apply_order_decrement, apply_purchase, check_order_availability, Availability};

/// Outcome of recording a sale
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// Pre-check taken before stock was decremented
    pub availability: Availability,
    pub updated_ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    ingredients: HashMap<Uuid, Ingredient>,
    products: HashMap<Uuid, Product>,
    purchases: Vec<Purchase>,
    sales: Vec<Sale>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load stored records as they are, keeping each product's cached pricing
    pub fn from_records(ingredients: HashMap<Uuid, Ingredient>, products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            ingredients,
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            ..Self::default()
        }
    }

    pub fn upsert_ingredient(&mut self, ingredient: Ingredient) {
        self.ingredients.insert(ingredient.id, ingredient);
    }

    pub fn ingredient(&self, id: Uuid) -> Option<&Ingredient> {
        self.ingredients.get(&id)
    }

    /// Insert or replace a product, refreshing its cached pricing
    pub fn upsert_product(&mut self, mut product: Product) {
        refresh_pricing(&mut product, &self.ingredients);
        self.products.insert(product.id, product);
    }

    pub fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    pub fn sales(&self) -> &[Sale] {
        &self.sales
    }

    /// Record a purchase and raise the ingredient's stock and price together
    pub fn record_purchase(&mut self, input: NewPurchase) -> Result<Purchase, LedgerError> {
        let ingredient = self
            .ingredients
            .get(&input.ingredient_id)
            .ok_or(LedgerError::IngredientNotFound(input.ingredient_id))?;

        let updated = apply_purchase(ingredient, input.quantity, &input.unit, input.price_per_kg);
        let purchase = input.into_purchase();

        self.ingredients.insert(updated.id, updated);
        self.purchases.push(purchase.clone());
        Ok(purchase)
    }

    /// Remove a purchase record. Stock it added stays in place.
    pub fn delete_purchase(&mut self, id: Uuid) -> Result<Purchase, LedgerError> {
        let pos = self
            .purchases
            .iter()
            .position(|p| p.id == id)
            .ok_or(LedgerError::PurchaseNotFound(id))?;
        Ok(self.purchases.remove(pos))
    }

    /// Record an order and decrement stock for its ingredient-based lines.
    ///
    /// With `enforce_stock` unset the availability check is advisory and the
    /// sale goes through with stock clamped at zero.
    pub fn record_sale(&mut self, input: NewSale, enforce_stock: bool) -> Result<SaleReceipt, LedgerError> {
        let items = price_sale_lines(&input.items, &self.products, &self.ingredients)?;

        let lines: Vec<(&Product, Decimal)> = items
            .iter()
            .filter_map(|item| self.products.get(&item.product_id).map(|p| (p, item.quantity)))
            .collect();

        let availability = check_order_availability(&lines, &self.ingredients);
        if enforce_stock && !availability.shortfalls.is_empty() {
            return Err(LedgerError::InsufficientStock {
                shortfalls: availability.shortfalls,
            });
        }

        let updated_ingredients = apply_order_decrement(&lines, &self.ingredients);
        let totals = compute_sale_totals(&items, &input.discount, &input.tax_rates);
        let sale = Sale::new(items, totals, input.payment_method, input.notes);

        for ingredient in &updated_ingredients {
            self.ingredients.insert(ingredient.id, ingredient.clone());
        }
        self.sales.push(sale.clone());

        Ok(SaleReceipt {
            sale,
            availability,
            updated_ingredients,
        })
    }

    /// Remove a sale record. Stock it consumed is not restored.
    pub fn delete_sale(&mut self, id: Uuid) -> Result<Sale, LedgerError> {
        let pos = self
            .sales
            .iter()
            .position(|s| s.id == id)
            .ok_or(LedgerError::SaleNotFound(id))?;
        Ok(self.sales.remove(pos))
    }

    /// Recompute cached cost and margin on every product; returns the ids of
    /// the products whose pricing changed, sorted
    pub fn refresh_product_costs(&mut self) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for product in self.products.values_mut() {
            let before = (product.cost_price, product.profit_margin);
            refresh_pricing(product, &self.ingredients);
            if before != (product.cost_price, product.profit_margin) {
                changed.push(product.id);
            }
        }
        changed.sort();
        changed
    }

    /// Ingredients at or below their minimum, sorted by name
    pub fn low_stock(&self) -> Vec<LowStockItem> {
        let mut items: Vec<LowStockItem> = self
            .ingredients
            .values()
            .filter(|i| i.is_low_stock())
            .map(LowStockItem::from)
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    /// Production capacity for every active product that consumes stock,
    /// tightest first, then by name
    pub fn capacity_report(&self) -> Vec<(&Product, ProductionCapacity)> {
        let mut report: Vec<(&Product, ProductionCapacity)> = self
            .products
            .values()
            .filter(|p| p.is_active)
            .filter_map(|p| production_capacity(p, &self.ingredients).map(|c| (p, c)))
            .collect();
        report.sort_by(|a, b| {
            a.1.max_units
                .cmp(&b.1.max_units)
                .then_with(|| a.0.name.cmp(&b.0.name))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        report
    }
}
