//! Validation utilities for BizManager
//!
//! Plain checks return `Result<(), &'static str>`; the `validate_*` hooks at
//! the bottom adapt them for `#[validate(custom = "...")]`.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Largest amount a `NUMERIC(14, 2)` column holds: 999,999,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// Most units a single line or item count may carry
pub const MAX_QUANTITY: i32 = 1_000_000;

// ============================================================================
// General Validations
// ============================================================================

/// A PIN is exactly four ASCII digits
pub fn check_pin(pin: &str) -> Result<(), &'static str> {
    if pin.len() != 4 {
        return Err("PIN must be exactly 4 digits");
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err("PIN must contain digits only");
    }
    Ok(())
}

pub fn check_not_blank(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value cannot be blank");
    }
    Ok(())
}

/// Prices and costs cannot be negative and must fit the money columns
pub fn check_money(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount > MAX_MONEY {
        return Err("Amount is too large");
    }
    Ok(())
}

/// Item lines move at least one unit
pub fn check_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Quantity must be at least 1");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity is too large");
    }
    Ok(())
}

// ============================================================================
// Morocco-Specific Validations
// ============================================================================

/// Validate Moroccan phone number format
/// Accepts: 0612345678, 06 12 34 56 78, +212612345678, 00212612345678
pub fn check_moroccan_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = if let Some(rest) = digits.strip_prefix("00212") {
        format!("0{}", rest)
    } else if phone.trim_start().starts_with('+') {
        match digits.strip_prefix("212") {
            Some(rest) => format!("0{}", rest),
            None => return Err("Only Moroccan numbers are accepted"),
        }
    } else {
        digits
    };

    if national.len() != 10 {
        return Err("Phone number must have 10 digits");
    }
    if !(national.starts_with("05") || national.starts_with("06") || national.starts_with("07")) {
        return Err("Phone number must start with 05, 06 or 07");
    }
    Ok(())
}

// ============================================================================
// validator hooks
// ============================================================================

fn to_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    check_pin(pin).map_err(|m| to_validation_error("pin", m))
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    check_not_blank(value).map_err(|m| to_validation_error("blank", m))
}

pub fn validate_money(amount: &Decimal) -> Result<(), ValidationError> {
    check_money(*amount).map_err(|m| to_validation_error("money", m))
}

/// Empty strings are treated as "no phone"
pub fn validate_optional_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Ok(());
    }
    check_moroccan_phone(phone).map_err(|m| to_validation_error("phone", m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pin() {
        assert!(check_pin("0000").is_ok());
        assert!(check_pin("1234").is_ok());
        assert!(check_pin("123").is_err());
        assert!(check_pin("12345").is_err());
        assert!(check_pin("12a4").is_err());
        assert!(check_pin("١٢٣٤").is_err()); // Arabic-Indic digits are not ASCII
    }

    #[test]
    fn test_check_money() {
        assert!(check_money(Decimal::ZERO).is_ok());
        assert!(check_money(Decimal::new(-1, 2)).is_err());
        assert_eq!(MAX_MONEY.to_string(), "999999999999.99");
        assert!(check_money(MAX_MONEY).is_ok());
        assert!(check_money(MAX_MONEY + Decimal::new(1, 2)).is_err());
        assert!(check_money(Decimal::MAX).is_err());
    }

    #[test]
    fn test_check_quantity() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(0).is_err());
        assert!(check_quantity(MAX_QUANTITY).is_ok());
        assert!(check_quantity(MAX_QUANTITY + 1).is_err());
        assert!(check_quantity(i32::MAX).is_err());
    }

    #[test]
    fn test_moroccan_phone_valid() {
        assert!(check_moroccan_phone("0612345678").is_ok());
        assert!(check_moroccan_phone("06 12 34 56 78").is_ok());
        assert!(check_moroccan_phone("0522123456").is_ok());
        assert!(check_moroccan_phone("+212612345678").is_ok());
        assert!(check_moroccan_phone("00212712345678").is_ok());
    }

    #[test]
    fn test_moroccan_phone_invalid() {
        assert!(check_moroccan_phone("12345").is_err());
        assert!(check_moroccan_phone("0812345678").is_err());
        assert!(check_moroccan_phone("+33612345678").is_err());
    }

    #[test]
    fn test_optional_phone_accepts_empty() {
        assert!(validate_optional_phone("").is_ok());
        assert!(validate_optional_phone("abc").is_err());
    }
}
