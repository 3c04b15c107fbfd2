//! Purchase ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::unit::{to_base, Unit};

/// An inventory acquisition. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    /// Price at the time of purchase; becomes the ingredient's price
    pub price_per_kg: Decimal,
    pub total_cost: Decimal,
    pub supplier: String,
    pub purchase_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub quantity_grams: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Data needed to record a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    pub price_per_kg: Decimal,
    pub supplier: String,
    pub purchase_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

impl NewPurchase {
    /// Cost of the purchased quantity at the purchase price
    pub fn total_cost(&self) -> Decimal {
        crate::costing::line_cost_at(self.quantity, &self.unit, self.price_per_kg)
    }

    pub fn quantity_grams(&self) -> Decimal {
        to_base(self.quantity, &self.unit)
    }

    /// Build the ledger entry with a fresh id
    pub fn into_purchase(self) -> Purchase {
        let total_cost = self.total_cost();
        let quantity_grams = self.quantity_grams();
        Purchase {
            id: Uuid::new_v4(),
            ingredient_id: self.ingredient_id,
            quantity: self.quantity,
            unit: self.unit,
            price_per_kg: self.price_per_kg,
            total_cost,
            supplier: self.supplier,
            purchase_date: self.purchase_date,
            delivery_date: self.delivery_date,
            invoice_number: self.invoice_number,
            notes: self.notes,
            quantity_grams,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_purchase_derived_fields() {
        let purchase = NewPurchase {
            ingredient_id: Uuid::new_v4(),
            quantity: Decimal::from(500),
            unit: Unit::Gram,
            price_per_kg: Decimal::from(12),
            supplier: "Mercado Central".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            delivery_date: None,
            invoice_number: Some("F-0012".to_string()),
            notes: None,
        }
        .into_purchase();

        assert_eq!(purchase.total_cost, Decimal::from(6));
        assert_eq!(purchase.quantity_grams, Decimal::from(500));
        assert_eq!(purchase.price_per_kg, Decimal::from_str("12").unwrap());
    }
}
