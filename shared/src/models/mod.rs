//! Domain models for the restaurant back office

mod ingredient;
mod product;
mod purchase;
mod sale;
pub mod unit;

pub use ingredient::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
pub use unit::Unit;
