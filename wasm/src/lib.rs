//! WebAssembly module for the Restaurant Back Office
//!
//! Runs the shared costing engine in the browser so forms can show costs,
//! margins, capacity and stock warnings before anything is saved.
//!
//! Quantities and money cross the boundary as decimal strings, records as
//! JSON, so no precision is lost to `f64`.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::costing::{self, cost_breakdown, production_capacity};
use shared::models::unit;
use shared::stock::check_availability;
use shared::{compute_sale_totals, Discount, Ingredient, Product, SaleItem, TaxRate, Unit};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("back-office engine loaded"));
}

// ============================================================================
// Plain-Rust core, testable off the browser
// ============================================================================

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(field: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", field, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization failed: {}", e))
}

fn index_ingredients(json: &str) -> Result<HashMap<Uuid, Ingredient>, String> {
    let list: Vec<Ingredient> = parse_json("ingredients", json)?;
    Ok(list.into_iter().map(|i| (i.id, i)).collect())
}

fn convert_impl(quantity: &str, from: &str, to: &str) -> Result<String, String> {
    let quantity = parse_decimal("quantity", quantity)?;
    Ok(unit::convert(quantity, &Unit::parse(from), &Unit::parse(to)).normalize().to_string())
}

fn line_cost_impl(quantity: &str, unit_tag: &str, price_per_kg: &str) -> Result<String, String> {
    let quantity = parse_decimal("quantity", quantity)?;
    let price = parse_decimal("price_per_kg", price_per_kg)?;
    let cost = costing::line_cost_at(quantity, &Unit::parse(unit_tag), price);
    Ok(cost.normalize().to_string())
}

fn margin_impl(cost: &str, selling_price: &str) -> Result<String, String> {
    let cost = parse_decimal("cost", cost)?;
    let selling = parse_decimal("selling_price", selling_price)?;
    Ok(format!("{:.2}", costing::round_money(costing::profit_margin(cost, selling))))
}

fn product_cost_impl(product_json: &str, ingredients_json: &str) -> Result<String, String> {
    let product: Product = parse_json("product", product_json)?;
    let ingredients = index_ingredients(ingredients_json)?;
    Ok(costing::product_cost(&product, &ingredients).normalize().to_string())
}

fn breakdown_impl(product_json: &str, ingredients_json: &str) -> Result<String, String> {
    let product: Product = parse_json("product", product_json)?;
    let ingredients = index_ingredients(ingredients_json)?;
    to_json(&cost_breakdown(&product, &ingredients))
}

fn capacity_impl(product_json: &str, ingredients_json: &str) -> Result<String, String> {
    let product: Product = parse_json("product", product_json)?;
    let ingredients = index_ingredients(ingredients_json)?;
    to_json(&production_capacity(&product, &ingredients))
}

fn availability_impl(product_json: &str, quantity: &str, ingredients_json: &str) -> Result<String, String> {
    let product: Product = parse_json("product", product_json)?;
    let quantity = parse_decimal("quantity", quantity)?;
    let ingredients = index_ingredients(ingredients_json)?;
    to_json(&check_availability(&product, quantity, &ingredients))
}

fn sale_totals_impl(items_json: &str, discount_json: &str, tax_rates_json: &str) -> Result<String, String> {
    let items: Vec<SaleItem> = parse_json("items", items_json)?;
    let discount: Discount = if discount_json.trim().is_empty() {
        Discount::None
    } else {
        parse_json("discount", discount_json)?
    };
    let tax_rates: Vec<TaxRate> = if tax_rates_json.trim().is_empty() {
        Vec::new()
    } else {
        parse_json("tax_rates", tax_rates_json)?
    };
    to_json(&compute_sale_totals(&items, &discount, &tax_rates))
}

fn product_problem_impl(product_json: &str) -> Result<String, String> {
    let product: Product = parse_json("product", product_json)?;
    let problem = shared::validate_name(&product.name)
        .and_then(|_| shared::validate_recipe(product.product_type, &product.ingredients))
        .and_then(|_| shared::validate_preparation_time(product.preparation_time));
    Ok(problem.err().unwrap_or_default().to_string())
}

// ============================================================================
// JavaScript bindings
// ============================================================================

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Convert a quantity between unit tags; unknown tags convert as identity
#[wasm_bindgen]
pub fn convert_quantity(quantity: &str, from: &str, to: &str) -> Result<String, JsValue> {
    convert_impl(quantity, from, to).map_err(js_err)
}

/// Cost of a quantity at a per-kilogram price
#[wasm_bindgen]
pub fn ingredient_line_cost(quantity: &str, unit: &str, price_per_kg: &str) -> Result<String, JsValue> {
    line_cost_impl(quantity, unit, price_per_kg).map_err(js_err)
}

/// Margin percentage, rounded to two places
#[wasm_bindgen]
pub fn profit_margin_percent(cost: &str, selling_price: &str) -> Result<String, JsValue> {
    margin_impl(cost, selling_price).map_err(js_err)
}

/// Unit cost of a product given the ingredient list
#[wasm_bindgen]
pub fn product_cost(product_json: &str, ingredients_json: &str) -> Result<String, JsValue> {
    product_cost_impl(product_json, ingredients_json).map_err(js_err)
}

/// Per-line cost breakdown as JSON
#[wasm_bindgen]
pub fn product_cost_breakdown(product_json: &str, ingredients_json: &str) -> Result<String, JsValue> {
    breakdown_impl(product_json, ingredients_json).map_err(js_err)
}

/// Production capacity as JSON; `null` when stock does not limit the product
#[wasm_bindgen]
pub fn product_capacity(product_json: &str, ingredients_json: &str) -> Result<String, JsValue> {
    capacity_impl(product_json, ingredients_json).map_err(js_err)
}

/// Advisory stock check as JSON
#[wasm_bindgen]
pub fn product_availability(product_json: &str, quantity: &str, ingredients_json: &str) -> Result<String, JsValue> {
    availability_impl(product_json, quantity, ingredients_json).map_err(js_err)
}

/// Order totals as JSON; discount and tax rates may be empty strings
#[wasm_bindgen]
pub fn sale_totals(items_json: &str, discount_json: &str, tax_rates_json: &str) -> Result<String, JsValue> {
    sale_totals_impl(items_json, discount_json, tax_rates_json).map_err(js_err)
}

/// First problem with a product form, or an empty string when it is valid
#[wasm_bindgen]
pub fn product_problem(product_json: &str) -> Result<String, JsValue> {
    product_problem_impl(product_json).map_err(js_err)
}
