//! Route handlers
//!
//! Every handler moves its store work onto the blocking pool: DuckDB calls
//! block, and the ledger's write lock may be held by another request.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use bankline_core::services::{Direction, RegisterRequest, TransferRequest};
use bankline_core::{Amount, BanklineContext};

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<T, ApiError>;

async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&BanklineContext) -> bankline_core::domain::result::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ctx = Arc::clone(&state.ctx);
    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid id: {}", raw)))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

// === Users ===

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let registration = blocking(&state, move |ctx| ctx.user_service.register(request)).await?;
    Ok((StatusCode::CREATED, Json(json!(registration))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let user_id = blocking(&state, move |ctx| {
        ctx.user_service.login(&request.email, &request.password)
    })
    .await?;
    Ok(Json(json!({ "userId": user_id })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_id(&user_id)?;
    let user = blocking(&state, move |ctx| ctx.user_service.get_user(user_id)).await?;
    Ok(Json(json!(user)))
}

pub async fn get_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_id(&user_id)?;
    let accounts = blocking(&state, move |ctx| ctx.user_service.accounts_for_user(user_id)).await?;
    Ok(Json(json!(accounts)))
}

pub async fn verify_account(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> ApiResult<Json<Value>> {
    let verification = blocking(&state, move |ctx| {
        ctx.user_service.verify_account(&account_number)
    })
    .await?;
    Ok(Json(json!(verification)))
}

// === Transfers ===

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let receipt = blocking(&state, move |ctx| ctx.ledger_service.transfer(request)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "transaction": receipt.transaction,
            "newBalance": receipt.source.balance,
        })),
    ))
}

pub async fn get_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_id(&user_id)?;
    let transactions = blocking(&state, move |ctx| {
        ctx.ledger_service.transactions_for_user(user_id)
    })
    .await?;
    Ok(Json(json!(transactions)))
}

// === Notifications ===

pub async fn get_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_id(&user_id)?;
    let notifications = blocking(&state, move |ctx| {
        ctx.notification_service.list_for_user(user_id)
    })
    .await?;
    Ok(Json(json!(notifications)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user_id = parse_id(&user_id)?;
    let count = blocking(&state, move |ctx| {
        ctx.notification_service.unread_count(user_id)
    })
    .await?;
    Ok(Json(json!({ "unreadCount": count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let notification_id = parse_id(&notification_id)?;
    blocking(&state, move |ctx| {
        ctx.notification_service.mark_read(notification_id)
    })
    .await?;
    Ok(Json(json!({ "success": true })))
}

// === Admin ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRequest {
    account_number: String,
    amount: Amount,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    account_number: String,
    amount: Amount,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTransactionRequest {
    account_number: String,
    amount: Amount,
    #[serde(rename = "type")]
    direction: Direction,
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

fn adjustment_body(receipt: bankline_core::services::AdjustmentReceipt) -> Json<Value> {
    Json(json!({
        "success": true,
        "transaction": receipt.transaction,
        "newBalance": receipt.account.balance,
    }))
}

pub async fn fund_account(
    State(state): State<AppState>,
    payload: Result<Json<FundRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let receipt = blocking(&state, move |ctx| {
        ctx.admin_service.fund_account(
            &request.account_number,
            request.amount,
            request.description.as_deref(),
            request.date.as_deref(),
        )
    })
    .await?;
    Ok(adjustment_body(receipt))
}

pub async fn debit_account(
    State(state): State<AppState>,
    payload: Result<Json<DebitRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let receipt = blocking(&state, move |ctx| {
        ctx.admin_service.debit_account(
            &request.account_number,
            request.amount,
            request.note.as_deref(),
            request.date.as_deref(),
        )
    })
    .await?;
    Ok(adjustment_body(receipt))
}

pub async fn admin_transaction(
    State(state): State<AppState>,
    payload: Result<Json<AdminTransactionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let receipt = blocking(&state, move |ctx| {
        ctx.admin_service.custom_transaction(
            &request.account_number,
            request.amount,
            request.direction,
            request.merchant.as_deref(),
            request.date.as_deref(),
        )
    })
    .await?;
    Ok(adjustment_body(receipt))
}

pub async fn accounts_summary(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let summary = blocking(&state, |ctx| ctx.admin_service.accounts_summary()).await?;
    Ok(Json(json!(summary)))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = blocking(&state, |ctx| ctx.user_service.list_users()).await?;
    Ok(Json(json!(users)))
}

pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let accounts = blocking(&state, |ctx| ctx.admin_service.list_accounts()).await?;
    Ok(Json(json!(accounts)))
}
