//! HTTP handlers for sales, purchases and expenses

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Transaction, TransactionFilter, TransactionInput, TransactionStatus};
use crate::services::transaction::Suggestions;
use crate::services::{ReportingService, TransactionService};
use crate::AppState;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: TransactionStatus,
}

/// List transactions, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<Transaction>>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.list(&filter).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<Transaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.get(transaction_id).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<TransactionInput>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let service = TransactionService::new(state.db);
    let transaction = service.create(input).await?;
    tracing::debug!(user_id = %current_user.0.user_id, transaction_id = %transaction.id, "Recorded by user");
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
    Json(input): Json<TransactionInput>,
) -> AppResult<Json<Transaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.update(transaction_id, input).await?))
}

/// Change status; stock follows
pub async fn set_transaction_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> AppResult<Json<Transaction>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.set_status(transaction_id, body.status).await?))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = TransactionService::new(state.db);
    service.delete(transaction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parties and categories already used, for autocomplete
pub async fn get_suggestions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Suggestions>> {
    let service = TransactionService::new(state.db);
    Ok(Json(service.suggestions().await?))
}

/// Download the filtered transactions as CSV
pub async fn export_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<impl IntoResponse> {
    let csv = ReportingService::new(state.db)
        .export_transactions(&filter)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"transactions.csv\""),
        ],
        csv,
    ))
}
