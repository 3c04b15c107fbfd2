//! Stock mutations caused by purchases and sales
//!
//! All functions are pure: they return updated copies and leave persistence to
//! the caller. Stock never goes below zero; oversell is reported through
//! `check_availability`, not by failing the decrement.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::unit::{convert, Unit};
use crate::models::{Ingredient, Product};

/// Add a purchase to stock and take its price (last purchase wins)
pub fn apply_purchase(
    ingredient: &Ingredient,
    quantity: Decimal,
    unit: &Unit,
    new_price_per_kg: Decimal,
) -> Ingredient {
    let mut updated = ingredient.clone();
    let added = convert(quantity, unit, &ingredient.unit);
    updated.current_stock = ingredient.current_stock.saturating_add(added).max(Decimal::ZERO);
    updated.price_per_kg = new_price_per_kg;
    updated.version = ingredient.version + 1;
    updated.updated_at = Utc::now();
    updated
}

/// Working copies of the ingredients a multi-line decrement touches
struct StockWorkspace<'a> {
    source: &'a HashMap<Uuid, Ingredient>,
    touched: Vec<Ingredient>,
    positions: HashMap<Uuid, usize>,
}

impl<'a> StockWorkspace<'a> {
    fn new(source: &'a HashMap<Uuid, Ingredient>) -> Self {
        Self {
            source,
            touched: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn get_mut(&mut self, id: &Uuid) -> Option<&mut Ingredient> {
        if let Some(&pos) = self.positions.get(id) {
            return self.touched.get_mut(pos);
        }
        let mut copy = self.source.get(id)?.clone();
        copy.version += 1;
        copy.updated_at = Utc::now();
        self.positions.insert(*id, self.touched.len());
        self.touched.push(copy);
        self.touched.last_mut()
    }

    fn decrement(&mut self, product: &Product, quantity_sold: Decimal) {
        if !product.consumes_stock() {
            return;
        }
        for line in &product.ingredients {
            let Some(ingredient) = self.get_mut(&line.ingredient_id) else {
                continue;
            };
            let used = convert(line.quantity.saturating_mul(quantity_sold), &line.unit, &ingredient.unit);
            ingredient.current_stock = ingredient.current_stock.saturating_sub(used).max(Decimal::ZERO);
        }
    }

    fn into_updated(self) -> Vec<Ingredient> {
        self.touched
    }
}

/// Decrement ingredient stock for `quantity_sold` units of a product.
///
/// Direct-cost products are a no-op. Lines whose ingredient is missing are
/// skipped. Returned ingredients are in first-touched recipe order.
pub fn apply_sale_decrement(
    product: &Product,
    quantity_sold: Decimal,
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Vec<Ingredient> {
    apply_order_decrement(&[(product, quantity_sold)], ingredients)
}

/// Decrement stock for every line of an order, accumulating per ingredient
pub fn apply_order_decrement(
    lines: &[(&Product, Decimal)],
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Vec<Ingredient> {
    let mut workspace = StockWorkspace::new(ingredients);
    for (product, quantity) in lines {
        workspace.decrement(product, *quantity);
    }
    workspace.into_updated()
}

/// An ingredient that cannot cover a requested quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shortfall {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    /// Both amounts in the ingredient's stocked unit
    pub needed: Decimal,
    pub have: Decimal,
    pub unit: Unit,
}

/// Result of a read-only stock pre-check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub sufficient: bool,
    pub shortfalls: Vec<Shortfall>,
    /// Recipe lines referencing ingredients that no longer exist
    pub missing: Vec<Uuid>,
}

impl Availability {
    fn from_needs(needs: Vec<(Uuid, Decimal)>, missing: Vec<Uuid>, ingredients: &HashMap<Uuid, Ingredient>) -> Self {
        let shortfalls: Vec<Shortfall> = needs
            .into_iter()
            .filter_map(|(id, needed)| {
                let ingredient = ingredients.get(&id)?;
                (needed > ingredient.current_stock).then(|| Shortfall {
                    ingredient_id: id,
                    ingredient_name: ingredient.name.clone(),
                    needed,
                    have: ingredient.current_stock,
                    unit: ingredient.unit.clone(),
                })
            })
            .collect();

        Self {
            sufficient: shortfalls.is_empty() && missing.is_empty(),
            shortfalls,
            missing,
        }
    }
}

/// Check whether stock covers `quantity` units of a product. Advisory only.
pub fn check_availability(
    product: &Product,
    quantity: Decimal,
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Availability {
    check_order_availability(&[(product, quantity)], ingredients)
}

/// Check a whole order, aggregating needs per ingredient
pub fn check_order_availability(
    lines: &[(&Product, Decimal)],
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Availability {
    let mut needs: Vec<(Uuid, Decimal)> = Vec::new();
    let mut missing: Vec<Uuid> = Vec::new();

    for (product, quantity) in lines {
        if !product.consumes_stock() {
            continue;
        }
        for line in &product.ingredients {
            let Some(ingredient) = ingredients.get(&line.ingredient_id) else {
                if !missing.contains(&line.ingredient_id) {
                    missing.push(line.ingredient_id);
                }
                continue;
            };
            let needed = convert(line.quantity.saturating_mul(*quantity), &line.unit, &ingredient.unit);
            match needs.iter_mut().find(|(id, _)| *id == ingredient.id) {
                Some((_, total)) => *total = total.saturating_add(needed),
                None => needs.push((ingredient.id, needed)),
            }
        }
    }

    Availability::from_needs(needs, missing, ingredients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductType;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn index(items: &[Ingredient]) -> HashMap<Uuid, Ingredient> {
        items.iter().map(|i| (i.id, i.clone())).collect()
    }

    #[test]
    fn test_apply_purchase_adds_and_overwrites_price() {
        let rice = Ingredient::new("Rice", Unit::Kilogram, dec("10")).with_stock(dec("1"));
        let updated = apply_purchase(&rice, dec("2"), &Unit::Kilogram, dec("12"));

        assert_eq!(updated.current_stock, dec("3"));
        assert_eq!(updated.price_per_kg, dec("12"));
        assert_eq!(updated.version, rice.version + 1);
    }

    #[test]
    fn test_apply_purchase_converts_to_stocked_unit() {
        let sugar = Ingredient::new("Sugar", Unit::Gram, dec("3")).with_stock(dec("250"));
        let updated = apply_purchase(&sugar, dec("1.5"), &Unit::Kilogram, dec("3.2"));
        assert_eq!(updated.current_stock, dec("1750"));
    }

    #[test]
    fn test_sale_decrement_clamps_at_zero() {
        let tomato = Ingredient::new("Tomato", Unit::Kilogram, dec("4")).with_stock(dec("0.3"));
        let salad = Product::new("Salad", ProductType::IngredientBased).with_line(tomato.id, dec("150"), Unit::Gram);
        let updated = apply_sale_decrement(&salad, dec("5"), &index(&[tomato]));

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].current_stock, Decimal::ZERO);
    }

    #[test]
    fn test_sale_decrement_accumulates_shared_ingredient() {
        let oil = Ingredient::new("Oil", Unit::Liter, dec("6")).with_stock(dec("1"));
        let fries = Product::new("Fries", ProductType::IngredientBased)
            .with_line(oil.id, dec("100"), Unit::Milliliter)
            .with_line(oil.id, dec("50"), Unit::Milliliter);
        let updated = apply_sale_decrement(&fries, dec("2"), &index(&[oil]));

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].current_stock, dec("0.7"));
    }

    #[test]
    fn test_sale_decrement_direct_cost_noop() {
        let water = Product::new("Water", ProductType::DirectCost).with_cost_price(dec("0.3"));
        assert!(apply_sale_decrement(&water, dec("3"), &HashMap::new()).is_empty());
    }

    #[test]
    fn test_check_availability_reports_shortfall_and_missing() {
        let bun = Ingredient::new("Bun", Unit::Piece, dec("0.4")).with_stock(dec("2"));
        let ghost = Uuid::new_v4();
        let burger = Product::new("Burger", ProductType::IngredientBased)
            .with_line(bun.id, dec("1"), Unit::Piece)
            .with_line(ghost, dec("120"), Unit::Gram);

        let availability = check_availability(&burger, dec("3"), &index(&[bun.clone()]));
        assert!(!availability.sufficient);
        assert_eq!(availability.missing, vec![ghost]);
        assert_eq!(availability.shortfalls.len(), 1);
        assert_eq!(availability.shortfalls[0].ingredient_name, "Bun");
        assert_eq!(availability.shortfalls[0].needed, dec("3"));
        assert_eq!(availability.shortfalls[0].have, dec("2"));
    }

    #[test]
    fn test_check_order_availability_aggregates_across_items() {
        let milk = Ingredient::new("Milk", Unit::Liter, dec("1.2")).with_stock(dec("0.5"));
        let latte = Product::new("Latte", ProductType::IngredientBased).with_line(milk.id, dec("200"), Unit::Milliliter);
        let flat_white = Product::new("Flat white", ProductType::IngredientBased).with_line(milk.id, dec("150"), Unit::Milliliter);
        let ingredients = index(&[milk]);

        assert!(check_availability(&latte, dec("2"), &ingredients).sufficient);
        let order = check_order_availability(&[(&latte, dec("2")), (&flat_white, dec("1"))], &ingredients);
        assert!(!order.sufficient);
        assert_eq!(order.shortfalls[0].needed, dec("0.55"));
    }
}
