//! Dashboard users and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_not_blank, validate_pin};

/// What a user is allowed to do
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
pub enum UserRole {
    Admin,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
        }
    }

    /// Admins manage users, settings and the item catalogue and may delete
    /// records. Staff record and edit transactions.
    pub fn can_manage(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "staff" => Ok(UserRole::Staff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A person who can sign in with a PIN. The PIN itself never leaves the
/// server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AppUser {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppUserInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_pin")]
    pub pin: String,
    pub role: UserRole,
}

/// Input for updating a user; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AppUserUpdate {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(custom = "validate_pin")]
    pub pin: Option<String>,
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_only_admin_manages() {
        assert!(UserRole::Admin.can_manage());
        assert!(!UserRole::Staff.can_manage());
    }

    #[test]
    fn test_input_pin_validation() {
        let ok = AppUserInput {
            name: "Salma".to_string(),
            pin: "0420".to_string(),
            role: UserRole::Staff,
        };
        assert!(ok.validate().is_ok());

        let bad = AppUserInput {
            pin: "42".to_string(),
            ..ok
        };
        assert!(bad.validate().is_err());
    }
}
