//! Route definitions for the Restaurant Back Office

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/ingredients", ingredient_routes())
        .nest("/products", product_routes(max_upload_bytes))
        .nest("/purchases", purchase_routes())
        .nest("/sales", sale_routes())
        .nest("/reports", report_routes())
}

/// Ingredient catalogue routes
fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/:id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
}

/// Product, costing and media routes
fn product_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/recalculate-costs", post(handlers::recalculate_costs))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:id/cost-breakdown", get(handlers::get_cost_breakdown))
        .route("/:id/capacity", get(handlers::get_capacity))
        .route("/:id/availability", post(handlers::check_availability))
        .route(
            "/:id/media",
            post(handlers::upload_media)
                .delete(handlers::delete_media)
                // Multipart framing on top of the file itself
                .layer(DefaultBodyLimit::max(max_upload_bytes + 64 * 1024)),
        )
}

/// Purchase ledger routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route("/:id", delete(handlers::delete_purchase))
}

/// Sale ledger routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/availability", post(handlers::check_order_availability))
        .route("/:id", get(handlers::get_sale).delete(handlers::delete_sale))
}

/// Reporting routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::get_low_stock_report))
        .route("/capacity", get(handlers::get_capacity_report))
        .route("/sales-summary", get(handlers::get_sales_summary))
}
