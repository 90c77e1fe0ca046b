//! User management service

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, Localized};
use crate::services::auth::hash_pin;
use shared::models::{AppUser, AppUserInput, AppUserUpdate, UserRole};

/// User service for managing dashboard accounts
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<AppUser>> {
        let users = sqlx::query_as::<_, AppUser>(
            "SELECT id, name, role, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<AppUser> {
        sqlx::query_as::<_, AppUser>("SELECT id, name, role, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn create(&self, input: AppUserInput) -> AppResult<AppUser> {
        input.validate()?;
        let pin_hash = hash_pin(&input.pin)?;

        let user = sqlx::query_as::<_, AppUser>(
            r#"
            INSERT INTO users (name, pin_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, role, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&pin_hash)
        .bind(input.role)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Update name, PIN or role. Returns the user and whether the PIN changed.
    pub async fn update(&self, id: Uuid, input: AppUserUpdate) -> AppResult<(AppUser, bool)> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let admins = lock_admins(&mut tx).await?;

        let current = sqlx::query_as::<_, AppUser>(
            "SELECT id, name, role, created_at FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if current.role == UserRole::Admin && input.role == Some(UserRole::Staff) {
            ensure_other_admin(&admins, id)?;
        }

        let pin_hash = input.pin.as_deref().map(hash_pin).transpose()?;

        let user = sqlx::query_as::<_, AppUser>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                pin_hash = COALESCE($3, pin_hash),
                role = COALESCE($4, role)
            WHERE id = $1
            RETURNING id, name, role, created_at
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(pin_hash.as_deref())
        .bind(input.role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok((user, input.pin.is_some()))
    }

    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> AppResult<()> {
        if id == acting_user {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: Localized::new(
                    "You cannot delete your own account",
                    "Vous ne pouvez pas supprimer votre propre compte",
                    "لا يمكنك حذف حسابك",
                ),
            });
        }

        let mut tx = self.db.begin().await?;
        let admins = lock_admins(&mut tx).await?;

        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if role == UserRole::Admin {
            ensure_other_admin(&admins, id)?;
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Lock every admin row, in id order, until the transaction ends.
///
/// Concurrent demotions and deletions queue here, so each one counts the
/// admins the previous one left behind.
async fn lock_admins(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>) -> AppResult<Vec<Uuid>> {
    let admins = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users WHERE role = 'admin' ORDER BY id FOR UPDATE",
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(admins)
}

/// Fail unless an admin other than `id` exists
fn ensure_other_admin(admins: &[Uuid], id: Uuid) -> AppResult<()> {
    if admins.iter().all(|admin| *admin == id) {
        tracing::warn!(user_id = %id, "Refused to remove the last admin");
        return Err(AppError::Conflict {
            resource: "user".to_string(),
            message: Localized::new(
                "At least one admin must remain",
                "Au moins un administrateur doit rester",
                "يجب أن يبقى مسؤول واحد على الأقل",
            ),
        });
    }
    Ok(())
}
