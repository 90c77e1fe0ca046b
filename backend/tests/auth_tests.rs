//! PIN, role and input validation tests
//!
//! Property-based and unit tests for:
//! - PIN format (exactly four ASCII digits)
//! - Moroccan phone numbers in local and international forms
//! - role permissions
//! - request payload validation

use std::str::FromStr;

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    AppUserInput, AppUserUpdate, InventoryItemInput, TransactionInput, TransactionType, UserRole,
};
use shared::validation::{check_money, check_moroccan_phone, check_pin, check_quantity};
use shared::Language;
use validator::Validate;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn valid_pin_strategy() -> impl Strategy<Value = String> {
    "[0-9]{4}"
}

/// Local mobile and landline numbers: 05, 06 or 07 then eight digits
fn local_phone_strategy() -> impl Strategy<Value = String> {
    "0[567][0-9]{8}"
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,30}"
}

fn transaction_input(kind: TransactionType) -> TransactionInput {
    TransactionInput {
        date: None,
        transaction_type: kind,
        status: None,
        party: "Youssef".to_string(),
        phone: None,
        address: None,
        category: None,
        item_id: None,
        quantity: None,
        unit_amount: None,
        delivery_cost: None,
        delivery_company_id: None,
        delivery_city: None,
        packaging_cost: None,
        packaging_option_id: None,
        notes: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_pin_examples() {
        assert!(check_pin("0420").is_ok());
        assert!(check_pin("").is_err());
        assert!(check_pin("12 4").is_err());
        assert!(check_pin("+123").is_err());
    }

    #[test]
    fn test_phone_examples() {
        assert!(check_moroccan_phone("0612345678").is_ok());
        assert!(check_moroccan_phone("06 12 34 56 78").is_ok());
        assert!(check_moroccan_phone("+212612345678").is_ok());
        assert!(check_moroccan_phone("00212712345678").is_ok());
        assert!(check_moroccan_phone("0812345678").is_err());
        assert!(check_moroccan_phone("+33612345678").is_err());
        assert!(check_moroccan_phone("061234567").is_err());
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Admin.can_manage());
        assert!(!UserRole::Staff.can_manage());
        assert_eq!(UserRole::from_str("staff"), Ok(UserRole::Staff));
        assert!(UserRole::from_str("owner").is_err());
    }

    #[test]
    fn test_user_input_validation() {
        let ok = AppUserInput {
            name: "Amina".to_string(),
            pin: "2580".to_string(),
            role: UserRole::Staff,
        };
        assert!(ok.validate().is_ok());

        let bad_pin = AppUserInput {
            pin: "25a0".to_string(),
            ..ok.clone()
        };
        assert!(bad_pin.validate().is_err());

        let blank_name = AppUserInput {
            name: "   ".to_string(),
            ..ok
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_user_update_allows_missing_fields() {
        assert!(AppUserUpdate::default().validate().is_ok());
        let update = AppUserUpdate {
            pin: Some("99".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_item_input_rejects_negative_price() {
        let input = InventoryItemInput {
            name: "Saffron 1g".to_string(),
            supplier: None,
            quantity: 10,
            buy_price: Decimal::from(-1),
            sell_price: Decimal::from(40),
            low_stock_threshold: None,
        };
        assert!(input.validate().is_err());
        assert_eq!(input.threshold_or_default(), 5);
    }

    #[test]
    fn test_transaction_input_validation() {
        let mut input = transaction_input(TransactionType::Sale);
        assert!(input.validate().is_ok());
        assert_eq!(input.quantity_or_default(), 1);

        input.phone = Some(String::new());
        assert!(input.validate().is_ok(), "blank phone means no phone");

        input.phone = Some("12345".to_string());
        assert!(input.validate().is_err());

        input.phone = None;
        input.quantity = Some(0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_status_defaults_by_type() {
        use shared::models::TransactionStatus;
        assert_eq!(
            transaction_input(TransactionType::Sale).status_or_default(),
            TransactionStatus::Pending
        );
        assert_eq!(
            transaction_input(TransactionType::Purchase).status_or_default(),
            TransactionStatus::Completed
        );
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::default(), Language::English);
        assert_eq!(Language::from_tag("ar-MA"), Some(Language::Arabic));
        assert!(Language::Arabic.is_rtl());
        assert!(!Language::French.is_rtl());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #[test]
    fn test_four_digit_pins_are_valid(pin in valid_pin_strategy()) {
        prop_assert!(check_pin(&pin).is_ok());
    }

    #[test]
    fn test_other_lengths_are_rejected(pin in "[0-9]{0,3}|[0-9]{5,8}") {
        prop_assert!(check_pin(&pin).is_err());
    }

    #[test]
    fn test_non_digits_are_rejected(prefix in "[0-9]{0,3}", bad in "[a-zA-Z .#-]") {
        let mut pin = prefix.clone();
        pin.push_str(&bad);
        while pin.len() < 4 {
            pin.push('0');
        }
        prop_assert!(check_pin(&pin).is_err());
    }

    /// Every local number is also accepted in both international forms
    #[test]
    fn test_phone_forms_agree(local in local_phone_strategy()) {
        let plus = format!("+212{}", &local[1..]);
        let zeros = format!("00212{}", &local[1..]);
        prop_assert!(check_moroccan_phone(&local).is_ok());
        prop_assert!(check_moroccan_phone(&plus).is_ok());
        prop_assert!(check_moroccan_phone(&zeros).is_ok());
    }

    #[test]
    fn test_money_sign(cents in -1_000_000i64..1_000_000) {
        let amount = Decimal::new(cents, 2);
        prop_assert_eq!(check_money(amount).is_ok(), cents >= 0);
    }

    #[test]
    fn test_quantity_floor(quantity in -100i32..100) {
        prop_assert_eq!(check_quantity(quantity).is_ok(), quantity >= 1);
    }

    #[test]
    fn test_valid_users_pass(name in name_strategy(), pin in valid_pin_strategy()) {
        let input = AppUserInput { name, pin, role: UserRole::Admin };
        prop_assert!(input.validate().is_ok());
    }
}
