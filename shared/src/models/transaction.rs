//! Sales, purchases and expenses

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::DateRange;
use crate::validation::{validate_money, validate_optional_phone};

/// Kind of money movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "transaction_type", rename_all = "snake_case")
)]
pub enum TransactionType {
    Sale,
    Purchase,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
            TransactionType::Expense => "expense",
        }
    }

    /// Whether this kind of transaction references an inventory item
    pub fn moves_stock(&self) -> bool {
        !matches!(self, TransactionType::Expense)
    }

    /// Status given to new transactions when the caller does not pick one.
    /// Sales wait for delivery, everything else is settled on entry.
    pub fn default_status(&self) -> TransactionStatus {
        match self {
            TransactionType::Sale => TransactionStatus::Pending,
            TransactionType::Purchase | TransactionType::Expense => TransactionStatus::Completed,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a transaction.
///
/// Any status may be changed to any other; there is no ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "transaction_status", rename_all = "snake_case")
)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refused,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refused => "refused",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded sale, purchase or expense
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "type", alias = "transaction_type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    /// Client for sales, supplier or payee otherwise
    pub party: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub item_id: Option<Uuid>,
    pub quantity: i32,
    /// Line total (unit amount times quantity)
    pub amount: Decimal,
    pub delivery_cost: Decimal,
    pub packaging_cost: Decimal,
    pub delivery_company: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount per unit, used as the cost basis of a purchase
    pub fn unit_amount(&self) -> Decimal {
        if self.quantity > 0 {
            self.amount / Decimal::from(self.quantity)
        } else {
            self.amount
        }
    }

    /// Delivery plus packaging
    pub fn shipping_cost(&self) -> Decimal {
        self.delivery_cost + self.packaging_cost
    }
}

/// Input for creating or replacing a transaction
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransactionInput {
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: Option<TransactionStatus>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub party: String,
    #[validate(custom = "validate_optional_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub item_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1_000_000))]
    pub quantity: Option<i32>,
    /// Price per unit; defaults to the item's sell or buy price
    #[validate(custom = "validate_money")]
    pub unit_amount: Option<Decimal>,
    /// Manual delivery cost, ignored when a company rate is picked
    #[validate(custom = "validate_money")]
    pub delivery_cost: Option<Decimal>,
    pub delivery_company_id: Option<Uuid>,
    pub delivery_city: Option<String>,
    /// Manual packaging cost, ignored when an option is picked
    #[validate(custom = "validate_money")]
    pub packaging_cost: Option<Decimal>,
    pub packaging_option_id: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl TransactionInput {
    pub fn quantity_or_default(&self) -> i32 {
        self.quantity.unwrap_or(1)
    }

    pub fn status_or_default(&self) -> TransactionStatus {
        self.status
            .unwrap_or_else(|| self.transaction_type.default_status())
    }
}

/// Query filter for listing transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

impl TransactionFilter {
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// Inclusive date bounds, either side optional
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if !self.date_range().contains(transaction.date) {
            return false;
        }
        if let Some(kind) = self.transaction_type {
            if transaction.transaction_type != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if transaction.status != status {
                return false;
            }
        }
        true
    }
}
