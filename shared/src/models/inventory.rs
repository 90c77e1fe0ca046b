//! Inventory items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_money, validate_not_blank};

/// Threshold used when an item is created without one
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// A stocked product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub supplier: Option<String>,
    /// Units on hand, moved by transactions
    pub quantity: i32,
    /// Weighted average cost per unit
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub low_stock_threshold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    /// Value of the units on hand at cost
    pub fn stock_value(&self) -> Decimal {
        self.buy_price * Decimal::from(self.quantity)
    }
}

/// Input for creating or replacing an inventory item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InventoryItemInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    #[validate(range(min = 0, max = 1_000_000))]
    pub quantity: i32,
    #[validate(custom = "validate_money")]
    pub buy_price: Decimal,
    #[validate(custom = "validate_money")]
    pub sell_price: Decimal,
    #[validate(range(min = 0, max = 1_000_000))]
    pub low_stock_threshold: Option<i32>,
}

impl InventoryItemInput {
    pub fn threshold_or_default(&self) -> i32 {
        self.low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, threshold: i32) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            name: "Argan oil 250ml".to_string(),
            supplier: Some("Coop Tiznit".to_string()),
            quantity,
            buy_price: Decimal::from(60),
            sell_price: Decimal::from(95),
            low_stock_threshold: threshold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_at_threshold() {
        assert!(item(5, 5).is_low_stock());
        assert!(item(0, 5).is_low_stock());
        assert!(!item(6, 5).is_low_stock());
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(item(3, 5).stock_value(), Decimal::from(180));
    }

    #[test]
    fn test_input_rejects_blank_name() {
        let input = InventoryItemInput {
            name: "   ".to_string(),
            supplier: None,
            quantity: 1,
            buy_price: Decimal::ONE,
            sell_price: Decimal::ONE,
            low_stock_threshold: None,
        };
        assert!(input.validate().is_err());
        assert_eq!(input.threshold_or_default(), DEFAULT_LOW_STOCK_THRESHOLD);
    }
}
