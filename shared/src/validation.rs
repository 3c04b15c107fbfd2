//! Validation utilities for back-office records
//!
//! Units are deliberately not validated here: unknown unit tags are accepted
//! and convert as identity.

use rust_decimal::Decimal;

use crate::models::{Discount, ProductIngredient, ProductType};

/// Largest quantity or amount accepted for storage
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Finest precision accepted for quantities and amounts
pub const MAX_DECIMAL_PLACES: u32 = 6;

// ============================================================================
// General Validations
// ============================================================================

/// Keep stored numbers in a range where the costing arithmetic stays exact
fn validate_magnitude(value: Decimal) -> Result<(), &'static str> {
    if value.abs() > MAX_AMOUNT {
        return Err("Value exceeds the maximum of 1000000000000");
    }
    if value.normalize().scale() > MAX_DECIMAL_PLACES {
        return Err("Value has more than 6 decimal places");
    }
    Ok(())
}

/// Validate a display name (ingredient, product, supplier)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Validate a price, stock level or other amount that may be zero
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    validate_magnitude(value)
}

/// Validate a purchased, sold or recipe quantity
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    validate_magnitude(quantity)
}

// ============================================================================
// Product Validations
// ============================================================================

/// Validate that a recipe is consistent with the product type
pub fn validate_recipe(product_type: ProductType, lines: &[ProductIngredient]) -> Result<(), &'static str> {
    match product_type {
        ProductType::DirectCost if !lines.is_empty() => {
            Err("Direct-cost products cannot have recipe lines")
        }
        ProductType::DirectCost => Ok(()),
        ProductType::IngredientBased => {
            if lines.iter().any(|l| l.quantity <= Decimal::ZERO) {
                return Err("Recipe quantities must be positive");
            }
            lines.iter().try_for_each(|l| validate_magnitude(l.quantity))
        }
    }
}

/// Validate preparation time in minutes
pub fn validate_preparation_time(minutes: i32) -> Result<(), &'static str> {
    if minutes < 0 {
        return Err("Preparation time cannot be negative");
    }
    if minutes > 24 * 60 {
        return Err("Preparation time exceeds one day");
    }
    Ok(())
}

// ============================================================================
// Sale Validations
// ============================================================================

pub fn validate_discount(discount: &Discount) -> Result<(), &'static str> {
    match discount {
        Discount::None => Ok(()),
        Discount::Percent(p) if *p < Decimal::ZERO || *p > Decimal::ONE_HUNDRED => {
            Err("Discount percentage must be between 0 and 100")
        }
        Discount::Amount(a) if *a < Decimal::ZERO => Err("Discount amount cannot be negative"),
        Discount::Amount(a) => validate_magnitude(*a),
        Discount::Percent(_) => Ok(()),
    }
}

pub fn validate_tax_rate(rate_percent: Decimal) -> Result<(), &'static str> {
    if rate_percent < Decimal::ZERO || rate_percent > Decimal::ONE_HUNDRED {
        return Err("Tax rate must be between 0 and 100");
    }
    Ok(())
}
