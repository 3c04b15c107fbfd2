//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::reporting::{ReportFilter, ReportingService};
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

fn parse_date(field: &str, value: Option<String>) -> AppResult<Option<NaiveDate>> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<NaiveDate>()
                .map_err(|_| AppError::validation(field, "Dates must be formatted YYYY-MM-DD"))
        })
        .transpose()
}

fn csv_response(csv: String, filename: &str) -> axum::response::Response {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

/// Get ingredients at or below their minimum stock
pub async fn get_low_stock_report(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let data = service.low_stock_report().await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok(csv_response(csv, "low_stock.csv"))
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get production capacity for every active product
pub async fn get_capacity_report(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let data = service.capacity_report().await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok(csv_response(csv, "capacity.csv"))
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get sales summary; CSV export contains the daily rows
pub async fn get_sales_summary(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = ReportFilter {
        start_date: parse_date("start_date", query.start_date)?,
        end_date: parse_date("end_date", query.end_date)?,
    };
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(AppError::validation("start_date", "start_date must not be after end_date"));
        }
    }

    let service = ReportingService::new(state.db);
    let summary = service.sales_summary(&filter).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&summary.daily)?;
        Ok(csv_response(csv, "sales_summary.csv"))
    } else {
        Ok(Json(summary).into_response())
    }
}
