use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::AccountId;
use crate::engine::TaxReport;
use crate::error::AppError;
use crate::export::write_events_csv;

#[derive(Debug, Deserialize)]
pub struct TaxQuery {
    /// RFC 3339, inclusive.
    pub start: Option<String>,
    /// RFC 3339, inclusive.
    pub end: Option<String>,
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| AppError::BadRequest(format!("invalid {name}: {s:?}")))
    })
    .transpose()
}

pub async fn get_tax_report(
    Path(id): Path<i64>,
    Query(params): Query<TaxQuery>,
    State(state): State<AppState>,
) -> Result<Json<TaxReport>, AppError> {
    let start = parse_bound("start", params.start.as_deref())?;
    let end = parse_bound("end", params.end.as_deref())?;

    let report = state
        .service
        .calculate(AccountId::new(id), start, end)
        .await?;
    Ok(Json(report))
}

pub async fn export_tax_csv(
    Path(id): Path<i64>,
    Query(params): Query<TaxQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let start = parse_bound("start", params.start.as_deref())?;
    let end = parse_bound("end", params.end.as_deref())?;

    let report = state
        .service
        .calculate(AccountId::new(id), start, end)
        .await?;

    let mut buf = Vec::new();
    write_events_csv(&report, &mut buf)
        .map_err(|e| AppError::Internal(format!("csv export failed: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tax_events.csv\"",
            ),
        ],
        buf,
    )
        .into_response())
}
