//! Costing engine: line cost, product cost, margin and production capacity
//!
//! Cost calculation tolerates gaps (a missing ingredient contributes nothing),
//! producibility does not (a missing ingredient makes the product unproducible).

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::unit::{to_base, to_canonical, Unit};
use crate::models::{Ingredient, Product, ProductType};

/// Round a monetary amount to cents
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of amounts, saturating at the `Decimal` bounds
pub fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

/// `a / b`, saturating towards the sign of the quotient on overflow and zero
/// when `b` is zero
fn saturating_div(a: Decimal, b: Decimal) -> Decimal {
    if b.is_zero() {
        return Decimal::ZERO;
    }
    a.checked_div(b).unwrap_or(if a.is_sign_negative() == b.is_sign_negative() {
        Decimal::MAX
    } else {
        Decimal::MIN
    })
}

/// Cost of `quantity` in `unit` at a per-kilogram price
pub fn line_cost_at(quantity: Decimal, unit: &Unit, price_per_kg: Decimal) -> Decimal {
    to_canonical(quantity, unit).saturating_mul(price_per_kg)
}

/// Cost of a recipe line; zero when the ingredient cannot be found
pub fn line_cost(ingredient: Option<&Ingredient>, quantity: Decimal, unit: &Unit) -> Decimal {
    match ingredient {
        Some(ingredient) => line_cost_at(quantity, unit, ingredient.price_per_kg),
        None => Decimal::ZERO,
    }
}

/// Cost of one unit of a product
pub fn product_cost(product: &Product, ingredients: &HashMap<Uuid, Ingredient>) -> Decimal {
    match product.product_type {
        ProductType::DirectCost => product.cost_price,
        ProductType::IngredientBased => saturating_sum(
            product
                .ingredients
                .iter()
                .map(|line| line_cost(ingredients.get(&line.ingredient_id), line.quantity, &line.unit)),
        ),
    }
}

/// Per-line cost for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostLine {
    pub ingredient_id: Uuid,
    pub ingredient_name: Option<String>,
    pub quantity: Decimal,
    pub unit: Unit,
    pub price_per_kg: Option<Decimal>,
    pub cost: Decimal,
    pub missing: bool,
}

/// Recipe cost broken down by line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub product_id: Uuid,
    pub product_type: ProductType,
    pub lines: Vec<CostLine>,
    pub total_cost: Decimal,
}

pub fn cost_breakdown(product: &Product, ingredients: &HashMap<Uuid, Ingredient>) -> CostBreakdown {
    if !product.is_ingredient_based() {
        return CostBreakdown {
            product_id: product.id,
            product_type: product.product_type,
            lines: Vec::new(),
            total_cost: product.cost_price,
        };
    }

    let lines: Vec<CostLine> = product
        .ingredients
        .iter()
        .map(|line| {
            let ingredient = ingredients.get(&line.ingredient_id);
            CostLine {
                ingredient_id: line.ingredient_id,
                ingredient_name: ingredient.map(|i| i.name.clone()),
                quantity: line.quantity,
                unit: line.unit.clone(),
                price_per_kg: ingredient.map(|i| i.price_per_kg),
                cost: line_cost(ingredient, line.quantity, &line.unit),
                missing: ingredient.is_none(),
            }
        })
        .collect();

    CostBreakdown {
        product_id: product.id,
        product_type: product.product_type,
        lines,
        total_cost: product_cost(product, ingredients),
    }
}

pub fn profit(cost: Decimal, selling_price: Decimal) -> Decimal {
    selling_price.saturating_sub(cost)
}

/// Margin as a percentage of the selling price.
///
/// Returns 0 when either the cost or the selling price is zero.
pub fn profit_margin(cost: Decimal, selling_price: Decimal) -> Decimal {
    if selling_price.is_zero() || cost.is_zero() {
        return Decimal::ZERO;
    }
    saturating_div(profit(cost, selling_price), selling_price).saturating_mul(Decimal::ONE_HUNDRED)
}

/// Recompute the cached cost and margin on a product. Idempotent.
pub fn refresh_pricing(product: &mut Product, ingredients: &HashMap<Uuid, Ingredient>) {
    product.cost_price = product_cost(product, ingredients);
    product.profit_margin = product
        .selling_price
        .map(|price| profit_margin(product.cost_price, price))
        .unwrap_or(Decimal::ZERO);
}

/// The recipe line that caps production
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitingIngredient {
    pub ingredient_id: Uuid,
    /// None when the ingredient no longer exists
    pub name: Option<String>,
}

/// How many units the current stock can produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionCapacity {
    pub max_units: u64,
    pub limiting_ingredient: Option<LimitingIngredient>,
    pub potential_revenue: Decimal,
    pub potential_profit: Decimal,
}

/// Units a single recipe line allows; `None` when the line needs nothing
fn units_for_line(
    stock: Option<&Ingredient>,
    required: Decimal,
    required_unit: &Unit,
) -> Option<u64> {
    let Some(ingredient) = stock else {
        return Some(0);
    };

    let required_base = to_base(required, required_unit);
    if required_base <= Decimal::ZERO {
        return None;
    }

    let stock_base = to_base(ingredient.current_stock, &ingredient.unit);
    let Some(ratio) = stock_base.checked_div(required_base) else {
        return Some(u64::MAX);
    };
    Some(ratio.floor().max(Decimal::ZERO).to_u64().unwrap_or(u64::MAX))
}

/// Maximum sellable units given current stock.
///
/// `None` means unconstrained: direct-cost products, products without recipe
/// lines, or recipes whose lines all require nothing. Ties for the minimum
/// keep the first line in recipe order.
pub fn production_capacity(
    product: &Product,
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Option<ProductionCapacity> {
    if !product.consumes_stock() {
        return None;
    }

    let mut best: Option<(u64, LimitingIngredient)> = None;
    for line in &product.ingredients {
        let ingredient = ingredients.get(&line.ingredient_id);
        let Some(units) = units_for_line(ingredient, line.quantity, &line.unit) else {
            continue;
        };
        let is_new_minimum = match &best {
            Some((current, _)) => units < *current,
            None => true,
        };
        if is_new_minimum {
            best = Some((
                units,
                LimitingIngredient {
                    ingredient_id: line.ingredient_id,
                    name: ingredient.map(|i| i.name.clone()),
                },
            ));
        }
    }

    let (max_units, limiting) = best?;
    let cost = product_cost(product, ingredients);
    let units = Decimal::from(max_units);
    let (potential_revenue, potential_profit) = match product.selling_price {
        Some(price) => (units.saturating_mul(price), units.saturating_mul(profit(cost, price))),
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    Some(ProductionCapacity {
        max_units,
        limiting_ingredient: Some(limiting),
        potential_revenue,
        potential_profit,
    })
}
