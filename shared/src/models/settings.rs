//! Delivery and packaging cost configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_money, validate_not_blank};

/// Delivery price for one city
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct DeliveryRate {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub city: String,
    #[validate(custom = "validate_money")]
    pub cost: Decimal,
}

/// A delivery company and its per-city rates, in display order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DeliveryCompany {
    pub id: Uuid,
    pub name: String,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub rates: Vec<DeliveryRate>,
}

impl DeliveryCompany {
    /// First rate whose city matches, ignoring case and surrounding spaces
    pub fn rate_for(&self, city: &str) -> Option<&DeliveryRate> {
        let wanted = city.trim().to_lowercase();
        self.rates
            .iter()
            .find(|rate| rate.city.trim().to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeliveryCompanyInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
}

/// A packaging choice with a flat cost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PackagingOption {
    pub id: Uuid,
    pub name: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PackagingOptionInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_money")]
    pub cost: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> DeliveryCompany {
        DeliveryCompany {
            id: Uuid::new_v4(),
            name: "Tawsil".to_string(),
            rates: vec![
                DeliveryRate {
                    city: "Casablanca".to_string(),
                    cost: Decimal::from(25),
                },
                DeliveryRate {
                    city: "Rabat".to_string(),
                    cost: Decimal::from(35),
                },
            ],
        }
    }

    #[test]
    fn test_rate_lookup_ignores_case() {
        let c = company();
        assert_eq!(c.rate_for(" rabat ").map(|r| r.cost), Some(Decimal::from(35)));
        assert!(c.rate_for("Agadir").is_none());
    }

    #[test]
    fn test_rates_roundtrip_as_json_array() {
        let json = serde_json::to_value(company()).unwrap();
        assert_eq!(json["rates"][0]["city"], "Casablanca");
    }
}
