//! Stock movement tests
//!
//! Covers:
//! - Purchases raising stock and replacing the price
//! - Sales decrementing stock, clamped at zero
//! - Advisory and enforced availability checks
//! - Deleting purchases and sales without reversing stock

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::InventoryLedger;
use shared::stock::{apply_order_decrement, apply_purchase, apply_sale_decrement, check_availability};
use shared::{Discount, Ingredient, LedgerError, NewPurchase, NewSale, Product, ProductType, SaleLineInput, Unit};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn index(items: &[Ingredient]) -> HashMap<Uuid, Ingredient> {
    items.iter().map(|i| (i.id, i.clone())).collect()
}

fn purchase(ingredient_id: Uuid, quantity: &str, unit: Unit, price_per_kg: &str) -> NewPurchase {
    NewPurchase {
        ingredient_id,
        quantity: dec(quantity),
        unit,
        price_per_kg: dec(price_per_kg),
        supplier: "Market".to_string(),
        purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        delivery_date: None,
        invoice_number: None,
        notes: None,
    }
}

fn order(product_id: Uuid, quantity: &str) -> NewSale {
    NewSale {
        items: vec![SaleLineInput {
            product_id,
            quantity: dec(quantity),
            sale_price: None,
        }],
        discount: Discount::None,
        ..Default::default()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_purchase_converts_into_stock_unit() {
        let flour = Ingredient::new("Flour", Unit::Kilogram, dec("2")).with_stock(dec("1"));
        let updated = apply_purchase(&flour, dec("500"), &Unit::Gram, dec("2.40"));

        assert_eq!(updated.current_stock, dec("1.5"));
        assert_eq!(updated.price_per_kg, dec("2.40"));
        assert_eq!(updated.stock_grams(), dec("1500"));
        assert_eq!(updated.version, flour.version + 1);
    }

    #[test]
    fn test_sale_decrement_clamps_at_zero() {
        let cheese = Ingredient::new("Cheese", Unit::Gram, dec("12")).with_stock(dec("100"));
        let pizza = Product::new("Pizza", ProductType::IngredientBased).with_line(cheese.id, dec("125"), Unit::Gram);

        let updated = apply_sale_decrement(&pizza, dec("2"), &index(&[cheese]));
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].current_stock, Decimal::ZERO);
    }

    #[test]
    fn test_direct_cost_sale_touches_no_stock() {
        let soda = Product::new("Soda", ProductType::DirectCost).with_cost_price(dec("0.8"));
        assert!(apply_sale_decrement(&soda, dec("5"), &HashMap::new()).is_empty());
    }

    #[test]
    fn test_order_decrement_accumulates_shared_ingredient() {
        let flour = Ingredient::new("Flour", Unit::Kilogram, dec("2")).with_stock(dec("1"));
        let bread = Product::new("Bread", ProductType::IngredientBased).with_line(flour.id, dec("300"), Unit::Gram);
        let pizza = Product::new("Pizza", ProductType::IngredientBased).with_line(flour.id, dec("250"), Unit::Gram);

        let updated = apply_order_decrement(&[(&bread, dec("1")), (&pizza, dec("2"))], &index(&[flour]));
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].current_stock, dec("0.2"));
        assert_eq!(updated[0].version, 1);
    }

    #[test]
    fn test_availability_reports_shortfall_in_stock_unit() {
        let flour = Ingredient::new("Flour", Unit::Kilogram, dec("2")).with_stock(dec("1"));
        let bread = Product::new("Bread", ProductType::IngredientBased).with_line(flour.id, dec("300"), Unit::Gram);

        let ok = check_availability(&bread, dec("3"), &index(&[flour.clone()]));
        assert!(ok.sufficient);

        let short = check_availability(&bread, dec("4"), &index(&[flour]));
        assert!(!short.sufficient);
        assert_eq!(short.shortfalls[0].needed, dec("1.2"));
        assert_eq!(short.shortfalls[0].have, dec("1"));
        assert_eq!(short.shortfalls[0].unit, Unit::Kilogram);
    }

    #[test]
    fn test_availability_lists_missing_ingredients() {
        let gone = Uuid::new_v4();
        let salad = Product::new("Salad", ProductType::IngredientBased).with_line(gone, dec("100"), Unit::Gram);

        let result = check_availability(&salad, dec("1"), &HashMap::new());
        assert!(!result.sufficient);
        assert!(result.shortfalls.is_empty());
        assert_eq!(result.missing, vec![gone]);
    }

    #[test]
    fn test_deleting_purchase_keeps_stock() {
        let mut ledger = InventoryLedger::new();
        let rice = Ingredient::new("Rice", Unit::Kilogram, dec("1.5"));
        let rice_id = rice.id;
        ledger.upsert_ingredient(rice);

        let recorded = ledger.record_purchase(purchase(rice_id, "5", Unit::Kilogram, "1.8")).unwrap();
        ledger.delete_purchase(recorded.id).unwrap();

        assert!(ledger.purchases().is_empty());
        assert_eq!(ledger.ingredient(rice_id).unwrap().current_stock, dec("5"));
        assert_eq!(ledger.ingredient(rice_id).unwrap().price_per_kg, dec("1.8"));
    }

    #[test]
    fn test_deleting_sale_keeps_decrement() {
        let mut ledger = InventoryLedger::new();
        let rice = Ingredient::new("Rice", Unit::Kilogram, dec("1.5")).with_stock(dec("2"));
        let rice_id = rice.id;
        ledger.upsert_ingredient(rice);
        let risotto = Product::new("Risotto", ProductType::IngredientBased)
            .with_line(rice_id, dec("150"), Unit::Gram)
            .with_selling_price(dec("14"));
        let risotto_id = risotto.id;
        ledger.upsert_product(risotto);

        let receipt = ledger.record_sale(order(risotto_id, "2"), false).unwrap();
        ledger.delete_sale(receipt.sale.id).unwrap();

        assert!(ledger.sales().is_empty());
        assert_eq!(ledger.ingredient(rice_id).unwrap().current_stock, dec("1.7"));
    }

    #[test]
    fn test_enforced_sale_rejected_without_stock_change() {
        let mut ledger = InventoryLedger::new();
        let rice = Ingredient::new("Rice", Unit::Kilogram, dec("1.5")).with_stock(dec("0.1"));
        let rice_id = rice.id;
        ledger.upsert_ingredient(rice);
        let risotto = Product::new("Risotto", ProductType::IngredientBased).with_line(rice_id, dec("150"), Unit::Gram);
        let risotto_id = risotto.id;
        ledger.upsert_product(risotto);

        let result = ledger.record_sale(order(risotto_id, "1"), true);
        assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
        assert_eq!(ledger.ingredient(rice_id).unwrap().current_stock, dec("0.1"));
        assert!(ledger.sales().is_empty());
    }

    #[test]
    fn test_unknown_records_are_reported() {
        let mut ledger = InventoryLedger::new();
        let missing = Uuid::new_v4();

        assert_eq!(
            ledger.record_purchase(purchase(missing, "1", Unit::Kilogram, "1")),
            Err(LedgerError::IngredientNotFound(missing))
        );
        assert!(matches!(
            ledger.record_sale(order(missing, "1"), false),
            Err(LedgerError::ProductNotFound(_))
        ));
        assert!(matches!(
            ledger.record_sale(NewSale::default(), false),
            Err(LedgerError::EmptySale)
        ));
        assert_eq!(ledger.delete_sale(missing), Err(LedgerError::SaleNotFound(missing)));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Stock never goes negative, whatever quantity is sold
        #[test]
        fn prop_stock_never_negative(
            stock_grams in 0i64..50_000,
            per_unit_grams in 0i64..2_000,
            sold in 0i64..100,
        ) {
            let flour = Ingredient::new("Flour", Unit::Gram, Decimal::ONE).with_stock(Decimal::from(stock_grams));
            let bread = Product::new("Bread", ProductType::IngredientBased)
                .with_line(flour.id, Decimal::from(per_unit_grams), Unit::Gram);

            let updated = apply_sale_decrement(&bread, Decimal::from(sold), &index(&[flour]));
            let expected = (stock_grams - per_unit_grams * sold).max(0);
            prop_assert_eq!(updated[0].current_stock, Decimal::from(expected));
            prop_assert!(updated[0].current_stock >= Decimal::ZERO);
        }

        /// A purchase adds exactly the converted quantity
        #[test]
        fn prop_purchase_adds_converted_quantity(
            stock in 0i64..100_000,
            bought_grams in 1i64..100_000,
        ) {
            let butter = Ingredient::new("Butter", Unit::Kilogram, Decimal::TEN).with_stock(Decimal::new(stock, 3));
            let updated = apply_purchase(&butter, Decimal::from(bought_grams), &Unit::Gram, Decimal::TEN);
            prop_assert_eq!(updated.current_stock - butter.current_stock, Decimal::new(bought_grams, 3));
        }

        /// An advisory check never changes stock and agrees with the decrement
        #[test]
        fn prop_sufficient_means_no_clamping(
            stock_grams in 0i64..10_000,
            per_unit_grams in 1i64..500,
            quantity in 1i64..40,
        ) {
            let flour = Ingredient::new("Flour", Unit::Gram, Decimal::ONE).with_stock(Decimal::from(stock_grams));
            let bread = Product::new("Bread", ProductType::IngredientBased)
                .with_line(flour.id, Decimal::from(per_unit_grams), Unit::Gram);
            let ingredients = index(&[flour]);

            let availability = check_availability(&bread, Decimal::from(quantity), &ingredients);
            let updated = apply_sale_decrement(&bread, Decimal::from(quantity), &ingredients);

            prop_assert_eq!(availability.sufficient, per_unit_grams * quantity <= stock_grams);
            if availability.sufficient {
                prop_assert_eq!(
                    updated[0].current_stock,
                    Decimal::from(stock_grams - per_unit_grams * quantity)
                );
            }
        }
    }
}
