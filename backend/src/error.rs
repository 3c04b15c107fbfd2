//! Error handling for the Restaurant Back Office
//!
//! Every failure leaves the server as `{ "error": { "code", "message", "field"? } }`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::stock::Shortfall;
use shared::LedgerError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Stock errors
    #[error("Insufficient stock for {} ingredient(s)", .shortfalls.len())]
    InsufficientStock { shortfalls: Vec<Shortfall> },

    #[error("Stock update failed for ingredient {ingredient_id}: {message}")]
    StockWriteFailed { ingredient_id: Uuid, message: String },

    // External service errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfalls: Option<Vec<Shortfall>>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            shortfalls: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource),
            ),
            AppError::InsufficientStock { shortfalls } => {
                let mut detail = ErrorDetail::new("INSUFFICIENT_STOCK", self.to_string());
                detail.shortfalls = Some(shortfalls.clone());
                (StatusCode::CONFLICT, detail)
            }
            AppError::StockWriteFailed { ingredient_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "STOCK_WRITE_FAILED",
                    format!("Failed to update stock for ingredient {}: {}", ingredient_id, message),
                )
                .with_field(&ingredient_id.to_string()),
            ),
            AppError::Storage(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new("STORAGE_ERROR", format!("Storage error: {}", msg)),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg)),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = %error_detail.code, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::IngredientNotFound(id) => AppError::NotFound(format!("Ingredient {}", id)),
            LedgerError::ProductNotFound(id) => AppError::NotFound(format!("Product {}", id)),
            LedgerError::PurchaseNotFound(id) => AppError::NotFound(format!("Purchase {}", id)),
            LedgerError::SaleNotFound(id) => AppError::NotFound(format!("Sale {}", id)),
            LedgerError::EmptySale => AppError::validation("items", "A sale needs at least one item"),
            LedgerError::InsufficientStock { shortfalls } => AppError::InsufficientStock { shortfalls },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("request".to_string(), "Invalid request".to_string()));
        AppError::Validation { field, message }
    }
}

/// Run a `shared::validation` check and name the field on failure
pub fn check(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::validation(field, message))
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_http_status() {
        let id = Uuid::new_v4();
        let (status, detail) = AppError::from(LedgerError::ProductNotFound(id)).status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail.code, "NOT_FOUND");

        let (status, detail) = AppError::from(LedgerError::EmptySale).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("items"));
    }

    #[test]
    fn test_insufficient_stock_carries_shortfalls() {
        let err = AppError::InsufficientStock { shortfalls: vec![] };
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");
        assert_eq!(detail.shortfalls, Some(vec![]));
    }

    #[test]
    fn test_check_names_field() {
        let err = check("quantity", Err("Quantity must be positive")).unwrap_err();
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("quantity"));
        assert_eq!(detail.message, "Quantity must be positive");
    }

    #[test]
    fn test_stock_write_failure_names_ingredient() {
        let id = Uuid::new_v4();
        let err = AppError::StockWriteFailed {
            ingredient_id: id,
            message: "row vanished".to_string(),
        };
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail.message.contains(&id.to_string()));
    }
}
