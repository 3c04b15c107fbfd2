//! Shared types and the costing engine for the Restaurant Back Office
//!
//! This crate holds everything that must compute the same numbers on the
//! server and in the browser (via WASM): units, recipes, costs, capacity and
//! stock mutations. Nothing in here performs I/O.

pub mod costing;
pub mod error;
pub mod ledger;
pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use error::LedgerError;
pub use models::*;
pub use types::*;
pub use validation::*;
