//! HTTP handlers for user management (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{AppUser, AppUserInput, AppUserUpdate};
use crate::services::{AuthService, UserService};
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AppUser>>> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db);
    Ok(Json(service.list().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<AppUser>> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db);
    Ok(Json(service.get(user_id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AppUserInput>,
) -> AppResult<(StatusCode, Json<AppUser>)> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db);
    let user = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user; a PIN change signs them out everywhere
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<AppUserUpdate>,
) -> AppResult<Json<AppUser>> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db.clone());
    let (user, pin_changed) = service.update(user_id, input).await?;
    if pin_changed {
        AuthService::new(state.db, &state.config)
            .revoke_all(user_id)
            .await?;
    }
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db);
    service.delete(user_id, current_user.0.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
