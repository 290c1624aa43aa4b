use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Account, AccountId, Currency, Decimal, Side, SpotExecution};
use crate::error::AppError;
use crate::storage::TaxStore;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub reporting_fiat: String,
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }

    let fiat = Currency::parse(&req.reporting_fiat)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if !fiat.is_fiat() {
        return Err(AppError::BadRequest(format!(
            "{fiat} is not a fiat currency"
        )));
    }

    let account = state.repo.insert_account(name, &fiat).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.repo.list_accounts().await?))
}

#[derive(Debug, Deserialize)]
pub struct ManualExecutionRequest {
    pub base: String,
    pub quote: String,
    pub side: String,
    pub qty: String,
    pub price: String,
    #[serde(default)]
    pub fees: Option<String>,
    /// RFC 3339, e.g. "2023-06-01T12:00:00Z".
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ManualExecutionResponse {
    pub exec_id: String,
}

fn parse_decimal_field(name: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest(format!("invalid {name}: {raw:?}")))
}

fn parse_timestamp_field(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest(format!("invalid timestamp: {raw:?}")))
}

pub async fn add_manual_execution(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ManualExecutionRequest>,
) -> Result<(StatusCode, Json<ManualExecutionResponse>), AppError> {
    let account_id = AccountId::new(id);
    state
        .repo
        .get_account(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {account_id}")))?;

    let base = Currency::parse(&req.base).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let quote = Currency::parse(&req.quote).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let side = Side::parse(&req.side)
        .ok_or_else(|| AppError::BadRequest(format!("invalid side: {:?}", req.side)))?;

    let qty = parse_decimal_field("qty", &req.qty)?;
    if !qty.is_positive() {
        return Err(AppError::BadRequest("qty must be positive".to_string()));
    }
    let price = parse_decimal_field("price", &req.price)?;
    if !price.is_positive() {
        return Err(AppError::BadRequest("price must be positive".to_string()));
    }
    let fees = req
        .fees
        .as_deref()
        .map(|f| parse_decimal_field("fees", f))
        .transpose()?
        .unwrap_or_else(Decimal::zero);
    if fees.is_negative() {
        return Err(AppError::BadRequest("fees must not be negative".to_string()));
    }
    let timestamp = parse_timestamp_field(&req.timestamp)?;

    let exec: SpotExecution = state
        .repo
        .insert_manual_execution(account_id, base, quote, side, qty, price, fees, timestamp)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ManualExecutionResponse {
            exec_id: exec.exec_id,
        }),
    ))
}
