//! HTTP handlers for the Restaurant Back Office API

pub mod health;
pub mod ingredient;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;

pub use health::health_check;
pub use ingredient::*;
pub use product::*;
pub use purchase::*;
pub use reporting::*;
pub use sale::*;
