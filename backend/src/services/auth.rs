//! Authentication service for PIN login and token management

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, Localized};
use shared::models::{AppUser, UserRole};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub name: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, name: &str, role: UserRole, expiry_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            name: name.to_string(),
            role,
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Result of a successful login
#[derive(Debug, Serialize)]
pub struct LoginResult {
    #[serde(flatten)]
    pub tokens: AuthTokens,
    pub user: AppUser,
}

/// User row including the PIN hash
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    role: UserRole,
    pin_hash: String,
    created_at: chrono::DateTime<Utc>,
}

impl From<UserRow> for AppUser {
    fn from(row: UserRow) -> Self {
        AppUser {
            id: row.id,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate with a PIN, optionally narrowed to one user name
    pub async fn login(&self, name: Option<&str>, pin: &str) -> AppResult<LoginResult> {
        if shared::validation::check_pin(pin).is_err() {
            return Err(AppError::InvalidCredentials);
        }

        let candidates = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, role, pin_hash, created_at
            FROM users
            WHERE $1::text IS NULL OR LOWER(name) = LOWER($1)
            ORDER BY created_at
            "#,
        )
        .bind(name.map(str::trim))
        .fetch_all(&self.db)
        .await?;

        let mut matched = None;
        for row in candidates {
            if verify_pin(pin, &row.pin_hash)? {
                matched = Some(row);
                break;
            }
        }

        let Some(row) = matched else {
            tracing::warn!(name = ?name, "Login failed");
            return Err(AppError::InvalidCredentials);
        };

        let user = AppUser::from(row);
        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
        Ok(LoginResult { tokens, user })
    }

    /// Exchange a refresh token for a new token pair, revoking the old one
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE u.id = rt.user_id
              AND rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
            RETURNING u.id, u.name, u.role, u.pin_hash, u.created_at
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: Localized::new(
                "Invalid or expired refresh token",
                "Jeton de rafraîchissement invalide ou expiré",
                "رمز التحديث غير صالح أو منتهي الصلاحية",
            ),
        })?;

        let user = AppUser::from(row);
        let tokens = self.generate_tokens(&user)?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(hash_token(&tokens.refresh_token))
        .bind(Utc::now() + Duration::seconds(self.refresh_token_expiry))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(refresh_token))
        .execute(&self.db)
        .await?;

        tracing::info!(revoked = result.rows_affected(), "Logout");
        Ok(())
    }

    /// Revoke every session of a user, e.g. after a PIN change or deletion
    pub async fn revoke_all(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Create the configured admin when no user exists yet
    pub async fn ensure_bootstrap_admin(&self, config: &Config) -> AppResult<Option<AppUser>> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let pin_hash = hash_pin(&config.auth.bootstrap_admin_pin)?;
        let user = sqlx::query_as::<_, AppUser>(
            r#"
            INSERT INTO users (name, pin_hash, role)
            VALUES ($1, $2, 'admin')
            RETURNING id, name, role, created_at
            "#,
        )
        .bind(&config.auth.bootstrap_admin_name)
        .bind(&pin_hash)
        .fetch_one(&self.db)
        .await?;

        tracing::warn!(
            user_id = %user.id,
            name = %user.name,
            "Created bootstrap admin; change its PIN"
        );
        Ok(Some(user))
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &AppUser) -> AppResult<AuthTokens> {
        let claims = Claims::new(user.id, &user.name, user.role, self.access_token_expiry);
        let access_token = encode_claims(&claims, &self.jwt_secret)?;

        // Refresh token (opaque random value)
        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Sign a set of claims
pub fn encode_claims(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its claims
pub fn decode_claims(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

pub fn hash_pin(pin: &str) -> AppResult<String> {
    hash(pin, DEFAULT_COST).map_err(|e| AppError::Internal(format!("PIN hashing failed: {}", e)))
}

pub fn verify_pin(pin: &str, pin_hash: &str) -> AppResult<bool> {
    verify(pin, pin_hash)
        .map_err(|e| AppError::Internal(format!("PIN verification failed: {}", e)))
}

/// SHA-256 digest of a refresh token, as stored in the database
pub fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
