//! HTTP handlers for delivery and packaging settings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{
    DeliveryCompany, DeliveryCompanyInput, DeliveryRate, PackagingOption, PackagingOptionInput,
};
use crate::services::settings::DeliveryQuote;
use crate::services::SettingsService;
use crate::AppState;

#[derive(Deserialize)]
pub struct CostQuery {
    pub city: String,
}

pub async fn list_delivery_companies(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<DeliveryCompany>>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.list_delivery().await?))
}

pub async fn get_delivery_company(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<DeliveryCompany>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.get_delivery(company_id).await?))
}

pub async fn create_delivery_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DeliveryCompanyInput>,
) -> AppResult<(StatusCode, Json<DeliveryCompany>)> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    let company = service.create_delivery(input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn rename_delivery_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
    Json(input): Json<DeliveryCompanyInput>,
) -> AppResult<Json<DeliveryCompany>> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    Ok(Json(service.rename_delivery(company_id, input).await?))
}

pub async fn delete_delivery_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    service.delete_delivery(company_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add or replace the rate for a city
pub async fn add_delivery_rate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
    Json(rate): Json<DeliveryRate>,
) -> AppResult<Json<DeliveryCompany>> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    Ok(Json(service.add_rate(company_id, rate).await?))
}

pub async fn remove_delivery_rate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((company_id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<DeliveryCompany>> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    Ok(Json(service.remove_rate(company_id, index).await?))
}

/// Delivery cost for a city, e.g. `?city=Rabat`
pub async fn get_delivery_cost(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
    Query(query): Query<CostQuery>,
) -> AppResult<Json<DeliveryQuote>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.quote(company_id, &query.city).await?))
}

pub async fn list_packaging_options(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<PackagingOption>>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.list_packaging().await?))
}

pub async fn get_packaging_option(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(option_id): Path<Uuid>,
) -> AppResult<Json<PackagingOption>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.get_packaging(option_id).await?))
}

pub async fn create_packaging_option(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PackagingOptionInput>,
) -> AppResult<(StatusCode, Json<PackagingOption>)> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    let option = service.create_packaging(input).await?;
    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn update_packaging_option(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(option_id): Path<Uuid>,
    Json(input): Json<PackagingOptionInput>,
) -> AppResult<Json<PackagingOption>> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    Ok(Json(service.update_packaging(option_id, input).await?))
}

pub async fn delete_packaging_option(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(option_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = SettingsService::new(state.db);
    service.delete_packaging(option_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
