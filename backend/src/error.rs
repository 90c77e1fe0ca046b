//! Error handling for BizManager
//!
//! Every error response carries its message in English, French and Arabic

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ledger::LedgerError;
use thiserror::Error;

/// A message in each supported language
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Localized {
    pub en: String,
    pub fr: String,
    pub ar: String,
}

impl Localized {
    pub fn new(en: impl Into<String>, fr: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            fr: fr.into(),
            ar: ar.into(),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid PIN")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {}", message.en)]
    Unauthorized { message: Localized },

    // Validation errors
    #[error("Validation error on {field}: {}", message.en)]
    Validation { field: String, message: Localized },

    #[error("Conflict: {}", message.en)]
    Conflict { resource: String, message: Localized },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: uuid::Uuid,
        available: i32,
        requested: i32,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field validation error
    pub fn invalid(field: &str, en: &str, fr: &str, ar: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: Localized::new(en, fr, ar),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                item_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                item_id,
                available,
                requested,
            },
            LedgerError::UnknownItem(id) => AppError::NotFound(format!("Inventory item {}", id)),
            LedgerError::OutOfRange(_) => AppError::invalid(
                "quantity",
                "Stock or cost would go out of range",
                "Le stock ou le coût dépasserait les limites",
                "المخزون أو التكلفة خارج الحدود المسموح بها",
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: Localized::new(
                format!("Invalid value: {}", errors),
                format!("Valeur invalide : {}", field),
                format!("قيمة غير صالحة: {}", field),
            ),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_fr: String,
    pub message_ar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: Localized, field: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message.en,
            message_fr: message.fr,
            message_ar: message.ar,
            field,
        }
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new(
                    "INVALID_CREDENTIALS",
                    Localized::new("Invalid PIN", "Code PIN invalide", "الرمز السري غير صحيح"),
                    None,
                ),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new(
                    "TOKEN_EXPIRED",
                    Localized::new(
                        "Session has expired",
                        "La session a expiré",
                        "انتهت صلاحية الجلسة",
                    ),
                    None,
                ),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new(
                    "INVALID_TOKEN",
                    Localized::new("Invalid token", "Jeton invalide", "رمز غير صالح"),
                    None,
                ),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    Localized::new(
                        "You do not have permission to perform this action",
                        "Vous n'avez pas la permission d'effectuer cette action",
                        "ليست لديك صلاحية للقيام بهذا الإجراء",
                    ),
                    None,
                ),
            ),
            AppError::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), None),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone(), Some(resource.clone())),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    Localized::new(
                        format!("{} not found", resource),
                        format!("{} introuvable", resource),
                        format!("{} غير موجود", resource),
                    ),
                    None,
                ),
            ),
            AppError::InsufficientStock {
                available,
                requested,
                ..
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    Localized::new(
                        format!(
                            "Insufficient stock: {} available, {} requested",
                            available, requested
                        ),
                        format!(
                            "Stock insuffisant : {} disponible(s), {} demandé(s)",
                            available, requested
                        ),
                        format!("المخزون غير كافٍ: المتوفر {}، المطلوب {}", available, requested),
                    ),
                    Some("quantity".to_string()),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    Localized::new(
                        "A database error occurred",
                        "Une erreur de base de données est survenue",
                        "حدث خطأ في قاعدة البيانات",
                    ),
                    None,
                ),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    Localized::new(
                        "An internal server error occurred",
                        "Une erreur interne du serveur est survenue",
                        "حدث خطأ داخلي في الخادم",
                    ),
                    None,
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
