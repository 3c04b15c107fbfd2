//! Sale totals tests
//!
//! Covers:
//! - Subtotal, discount and tax arithmetic
//! - Price overrides and cost snapshots on sale lines
//! - Discount clamping

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{compute_sale_totals, price_sale_lines, Discount, Ingredient, Product, ProductType, SaleItem, SaleLineInput, TaxRate, Unit};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(quantity: Decimal, sale_price: Decimal, cost_price: Decimal) -> SaleItem {
    SaleItem {
        product_id: Uuid::new_v4(),
        name: "Dish".to_string(),
        quantity,
        sale_price,
        original_price: sale_price,
        cost_price,
    }
}

fn vat(rate: &str) -> TaxRate {
    TaxRate {
        name: "VAT".to_string(),
        rate_percent: dec(rate),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_percent_discount_then_tax() {
        let items = vec![item(dec("2"), dec("12.50"), dec("4")), item(dec("1"), dec("15"), dec("5"))];
        let totals = compute_sale_totals(&items, &Discount::Percent(dec("10")), &[vat("7")]);

        assert_eq!(totals.subtotal, dec("40"));
        assert_eq!(totals.discount, dec("4"));
        assert_eq!(totals.taxes[0].amount, dec("2.52"));
        assert_eq!(totals.total, dec("38.52"));
        assert_eq!(totals.cost_total, dec("13"));
        assert_eq!(totals.profit_total, dec("23"));
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let items = vec![item(dec("1"), dec("6"), dec("2"))];
        let totals = compute_sale_totals(&items, &Discount::Amount(dec("10")), &[]);

        assert_eq!(totals.discount, dec("6"));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        let items = vec![item(dec("1"), dec("0.50"), Decimal::ZERO)];
        let totals = compute_sale_totals(&items, &Discount::None, &[vat("5")]);

        // 0.025 rounds up to 0.03
        assert_eq!(totals.taxes[0].amount, dec("0.03"));
        assert_eq!(totals.total, dec("0.53"));
    }

    #[test]
    fn test_sale_lines_snapshot_price_and_cost() {
        let flour = Ingredient::new("Flour", Unit::Kilogram, dec("2"));
        let bread = Product::new("Bread", ProductType::IngredientBased)
            .with_line(flour.id, dec("500"), Unit::Gram)
            .with_selling_price(dec("4"));
        let products: HashMap<Uuid, Product> = [(bread.id, bread.clone())].into_iter().collect();
        let ingredients: HashMap<Uuid, Ingredient> = [(flour.id, flour)].into_iter().collect();

        let lines = vec![
            SaleLineInput {
                product_id: bread.id,
                quantity: dec("2"),
                sale_price: None,
            },
            SaleLineInput {
                product_id: bread.id,
                quantity: dec("1"),
                sale_price: Some(dec("3")),
            },
        ];
        let items = price_sale_lines(&lines, &products, &ingredients).unwrap();

        assert_eq!(items[0].sale_price, dec("4"));
        assert!(!items[0].is_price_overridden());
        assert_eq!(items[1].sale_price, dec("3"));
        assert!(items[1].is_price_overridden());
        assert_eq!(items[1].cost_price, dec("1"));
        assert_eq!(items[0].name, "Bread");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..100_000).prop_map(|n| Decimal::new(n, 2))
    }

    fn discount_strategy() -> impl Strategy<Value = Discount> {
        prop_oneof![
            Just(Discount::None),
            (0i64..=100).prop_map(|p| Discount::Percent(Decimal::from(p))),
            money().prop_map(Discount::Amount),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Discount stays within the subtotal and the total adds up
        #[test]
        fn prop_totals_add_up(
            lines in prop::collection::vec((1i64..10, money(), money()), 1..6),
            discount in discount_strategy(),
            rates in prop::collection::vec(0i64..=25, 0..3),
        ) {
            let items: Vec<SaleItem> = lines
                .into_iter()
                .map(|(q, price, cost)| item(Decimal::from(q), price, cost))
                .collect();
            let tax_rates: Vec<TaxRate> = rates
                .into_iter()
                .map(|r| TaxRate { name: format!("Tax {}", r), rate_percent: Decimal::from(r) })
                .collect();

            let totals = compute_sale_totals(&items, &discount, &tax_rates);
            let tax_total: Decimal = totals.taxes.iter().map(|t| t.amount).sum();

            prop_assert!(totals.discount >= Decimal::ZERO);
            prop_assert!(totals.discount <= totals.subtotal);
            prop_assert_eq!(totals.total, totals.subtotal - totals.discount + tax_total);
            prop_assert_eq!(totals.profit_total, totals.subtotal - totals.discount - totals.cost_total);
            prop_assert!(totals.total >= Decimal::ZERO);
        }
    }
}
