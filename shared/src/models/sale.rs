//! Sales ledger models and order totals

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Ingredient, Product};
use crate::costing::{product_cost, round_money, saturating_sum};
use crate::error::LedgerError;

/// A line on a recorded sale. Prices are snapshots taken at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    /// Unit price actually charged
    pub sale_price: Decimal,
    /// Product list price at sale time
    pub original_price: Decimal,
    /// Unit cost at sale time
    pub cost_price: Decimal,
}

impl SaleItem {
    pub fn line_total(&self) -> Decimal {
        self.sale_price.saturating_mul(self.quantity)
    }

    pub fn line_cost(&self) -> Decimal {
        self.cost_price.saturating_mul(self.quantity)
    }

    pub fn is_price_overridden(&self) -> bool {
        self.sale_price != self.original_price
    }
}

/// Order-level discount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    /// Percentage of the subtotal
    Percent(Decimal),
    /// Fixed amount off the subtotal
    Amount(Decimal),
}

impl Discount {
    /// Discount amount for a subtotal, clamped to `[0, subtotal]`
    pub fn amount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self {
            Discount::None => Decimal::ZERO,
            Discount::Percent(percent) => subtotal.saturating_mul(*percent) / Decimal::ONE_HUNDRED,
            Discount::Amount(amount) => *amount,
        };
        raw.max(Decimal::ZERO).min(subtotal.max(Decimal::ZERO))
    }
}

/// A tax applied to the discounted subtotal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxRate {
    pub name: String,
    pub rate_percent: Decimal,
}

/// Computed tax on a sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxLine {
    pub name: String,
    pub rate_percent: Decimal,
    pub amount: Decimal,
}

/// Monetary totals for an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub taxes: Vec<TaxLine>,
    pub total: Decimal,
    pub cost_total: Decimal,
    pub profit_total: Decimal,
}

/// Compute subtotal, discount, taxes and profit for a set of sale lines
pub fn compute_sale_totals(items: &[SaleItem], discount: &Discount, tax_rates: &[TaxRate]) -> SaleTotals {
    let subtotal = round_money(saturating_sum(items.iter().map(SaleItem::line_total)));
    let discount = round_money(discount.amount_for(subtotal));
    let taxable = subtotal.saturating_sub(discount);

    let taxes: Vec<TaxLine> = tax_rates
        .iter()
        .map(|rate| TaxLine {
            name: rate.name.clone(),
            rate_percent: rate.rate_percent,
            amount: round_money(taxable.saturating_mul(rate.rate_percent) / Decimal::ONE_HUNDRED),
        })
        .collect();
    let tax_total = saturating_sum(taxes.iter().map(|t| t.amount));

    let cost_total = round_money(saturating_sum(items.iter().map(SaleItem::line_cost)));

    SaleTotals {
        subtotal,
        discount,
        taxes,
        total: taxable.saturating_add(tax_total),
        cost_total,
        profit_total: taxable.saturating_sub(cost_total),
    }
}

/// A recorded order. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    pub items: Vec<SaleItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub taxes: Vec<TaxLine>,
    pub total: Decimal,
    pub cost_total: Decimal,
    pub profit_total: Decimal,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(items: Vec<SaleItem>, totals: SaleTotals, payment_method: Option<String>, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            taxes: totals.taxes,
            total: totals.total,
            cost_total: totals.cost_total,
            profit_total: totals.profit_total,
            payment_method,
            notes,
            sold_at: Utc::now(),
        }
    }
}

/// A requested order line before prices are resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// Overrides the product's selling price when set
    pub sale_price: Option<Decimal>,
}

/// Data needed to record an order
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewSale {
    pub items: Vec<SaleLineInput>,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub tax_rates: Vec<TaxRate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Resolve names and price snapshots for the requested lines
pub fn price_sale_lines(
    lines: &[SaleLineInput],
    products: &HashMap<Uuid, Product>,
    ingredients: &HashMap<Uuid, Ingredient>,
) -> Result<Vec<SaleItem>, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptySale);
    }

    lines
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or(LedgerError::ProductNotFound(line.product_id))?;
            let original_price = product.selling_price.unwrap_or(Decimal::ZERO);
            Ok(SaleItem {
                product_id: product.id,
                name: product.name.clone(),
                quantity: line.quantity,
                sale_price: line.sale_price.unwrap_or(original_price),
                original_price,
                cost_price: product_cost(product, ingredients),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(quantity: &str, sale_price: &str, cost_price: &str) -> SaleItem {
        SaleItem {
            product_id: Uuid::new_v4(),
            name: "Item".to_string(),
            quantity: dec(quantity),
            sale_price: dec(sale_price),
            original_price: dec(sale_price),
            cost_price: dec(cost_price),
        }
    }

    #[test]
    fn test_totals_without_discount_or_tax() {
        let items = vec![item("2", "12.50", "4"), item("1", "8", "3")];
        let totals = compute_sale_totals(&items, &Discount::None, &[]);

        assert_eq!(totals.subtotal, dec("33"));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec("33"));
        assert_eq!(totals.cost_total, dec("11"));
        assert_eq!(totals.profit_total, dec("22"));
    }

    #[test]
    fn test_percent_discount_and_tax() {
        let items = vec![item("4", "25", "10")];
        let taxes = vec![TaxRate {
            name: "VAT".to_string(),
            rate_percent: dec("10"),
        }];
        let totals = compute_sale_totals(&items, &Discount::Percent(dec("10")), &taxes);

        // 100 - 10 = 90 taxable, 9 tax
        assert_eq!(totals.discount, dec("10"));
        assert_eq!(totals.taxes[0].amount, dec("9"));
        assert_eq!(totals.total, dec("99"));
        assert_eq!(totals.profit_total, dec("50"));
    }

    #[test]
    fn test_amount_discount_clamped_to_subtotal() {
        let items = vec![item("1", "5", "2")];
        let totals = compute_sale_totals(&items, &Discount::Amount(dec("20")), &[]);

        assert_eq!(totals.discount, dec("5"));
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.profit_total, dec("-2"));
    }

    #[test]
    fn test_totals_saturate_on_huge_lines() {
        let huge = "10000000000000000000000000000";
        let items = vec![item(huge, "100", "1"), item("1", "5", "1")];
        let totals = compute_sale_totals(&items, &Discount::None, &[]);

        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total, Decimal::MAX);
    }

    #[test]
    fn test_discount_serde_shape() {
        let discount: Discount = serde_json::from_str(r#"{"type":"percent","value":"15"}"#).unwrap();
        assert_eq!(discount, Discount::Percent(dec("15")));

        let none: Discount = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(none, Discount::None);
    }
}
