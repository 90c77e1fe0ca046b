//! Dashboard and report handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::{CurrentUser, RequestLanguage};
use crate::services::reporting::{DashboardMetrics, PeriodReport, ReportFilter, ShareText};
use crate::services::ReportingService;
use crate::AppState;
use shared::i18n::Language;

#[derive(Deserialize)]
pub struct ShareQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Overrides Accept-Language
    pub lang: Option<Language>,
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.dashboard().await?))
}

/// Summary and breakdowns for a date range
pub async fn get_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ReportFilter>,
) -> AppResult<Json<PeriodReport>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.period_report(&filter).await?))
}

/// Report summary as shareable text
pub async fn get_share_text(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    RequestLanguage(requested): RequestLanguage,
    Query(query): Query<ShareQuery>,
) -> AppResult<Json<ShareText>> {
    let filter = ReportFilter {
        start: query.start,
        end: query.end,
    };
    let language = query.lang.unwrap_or(requested);
    let service = ReportingService::new(state.db);
    Ok(Json(service.share_text(&filter, language).await?))
}
