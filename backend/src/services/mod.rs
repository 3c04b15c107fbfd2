//! Business logic services for the Restaurant Back Office

pub mod ingredient;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;

pub use ingredient::IngredientService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use reporting::ReportingService;
pub use sale::SaleService;
