//! Errors raised by ledger operations
//!
//! The costing engine itself never fails; these cover record lookups and
//! policy checks made while recording purchases and sales.

use thiserror::Error;
use uuid::Uuid;

use crate::stock::Shortfall;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Ingredient not found: {0}")]
    IngredientNotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Purchase not found: {0}")]
    PurchaseNotFound(Uuid),

    #[error("Sale not found: {0}")]
    SaleNotFound(Uuid),

    #[error("A sale needs at least one line")]
    EmptySale,

    #[error("Insufficient stock for {} ingredient(s)", .shortfalls.len())]
    InsufficientStock { shortfalls: Vec<Shortfall> },
}
