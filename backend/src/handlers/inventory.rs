//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{InventoryItem, InventoryItemInput};
use crate::services::{InventoryService, ReportingService};
use crate::AppState;

/// List all items
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.list().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.get(item_id).await?))
}

/// Items at or below their low-stock threshold
pub async fn list_low_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.low_stock().await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<InventoryItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    let item = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<InventoryItemInput>,
) -> AppResult<Json<InventoryItem>> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.update(item_id, input).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    service.delete(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download the catalogue as CSV
pub async fn export_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let csv = ReportingService::new(state.db).export_inventory().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory.csv\""),
        ],
        csv,
    ))
}
