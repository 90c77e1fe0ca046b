//! Authentication middleware
//!
//! JWT authentication and role checks

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::models::UserRole;
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse, Localized};
use crate::services::auth::decode_claims;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.can_manage()
    }

    /// Fail with 403 unless the user is an admin
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, "Admin action refused");
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware that validates the bearer token and stores the
/// [`AuthUser`] in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    let auth_user = match authenticate(bearer.token(), &state.config.jwt.secret) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Turn a raw access token into an [`AuthUser`]
pub fn authenticate(token: &str, secret: &str) -> AppResult<AuthUser> {
    let claims = decode_claims(token, secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        name: claims.name,
        role: claims.role,
    })
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new(
            "UNAUTHORIZED",
            Localized::new(message, "Non autorisé", "غير مصرح"),
            None,
        ),
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new(
                        "UNAUTHORIZED",
                        Localized::new(
                            "Authentication required",
                            "Authentification requise",
                            "يجب تسجيل الدخول أولاً",
                        ),
                        None,
                    ),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::{encode_claims, Claims};

    const SECRET: &str = "test-secret-key-0123456789";

    fn staff() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: "Sara".to_string(),
            role: UserRole::Staff,
        }
    }

    #[test]
    fn test_staff_cannot_manage() {
        assert!(matches!(
            staff().require_admin(),
            Err(AppError::InsufficientPermissions)
        ));
        let admin = AuthUser {
            role: UserRole::Admin,
            ..staff()
        };
        assert!(admin.require_admin().is_ok());
    }

    #[test]
    fn test_authenticate_round_trip() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "Youssef", UserRole::Admin, 3600);
        let token = encode_claims(&claims, SECRET).unwrap();
        let user = authenticate(&token, SECRET).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, UserRole::Admin);
        assert!(authenticate(&token, "another-secret-key-987654").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), "Old", UserRole::Staff, 3600);
        claims.exp = claims.iat - 7200;
        let token = encode_claims(&claims, SECRET).unwrap();
        assert!(matches!(
            authenticate(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }
}
