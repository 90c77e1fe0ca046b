//! Delivery company and packaging configuration

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{
    DeliveryCompany, DeliveryCompanyInput, DeliveryRate, PackagingOption, PackagingOptionInput,
};

/// Settings service for shipping cost configuration
#[derive(Clone)]
pub struct SettingsService {
    db: PgPool,
}

/// Delivery cost for a company and city
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryQuote {
    pub company_id: Uuid,
    pub company: String,
    pub city: String,
    pub cost: Decimal,
}

impl SettingsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ---- Delivery companies ----

    pub async fn list_delivery(&self) -> AppResult<Vec<DeliveryCompany>> {
        let companies = sqlx::query_as::<_, DeliveryCompany>(
            "SELECT id, name, rates FROM delivery_config ORDER BY LOWER(name)",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(companies)
    }

    pub async fn get_delivery(&self, id: Uuid) -> AppResult<DeliveryCompany> {
        sqlx::query_as::<_, DeliveryCompany>(
            "SELECT id, name, rates FROM delivery_config WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery company".to_string()))
    }

    pub async fn create_delivery(&self, input: DeliveryCompanyInput) -> AppResult<DeliveryCompany> {
        input.validate()?;

        let company = sqlx::query_as::<_, DeliveryCompany>(
            "INSERT INTO delivery_config (name) VALUES ($1) RETURNING id, name, rates",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(company_id = %company.id, name = %company.name, "Delivery company created");
        Ok(company)
    }

    pub async fn rename_delivery(
        &self,
        id: Uuid,
        input: DeliveryCompanyInput,
    ) -> AppResult<DeliveryCompany> {
        input.validate()?;

        sqlx::query_as::<_, DeliveryCompany>(
            "UPDATE delivery_config SET name = $2 WHERE id = $1 RETURNING id, name, rates",
        )
        .bind(id)
        .bind(input.name.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery company".to_string()))
    }

    pub async fn delete_delivery(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM delivery_config WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Delivery company".to_string()));
        }
        tracing::info!(company_id = %id, "Delivery company deleted");
        Ok(())
    }

    /// Append a city rate. A city already listed has its cost replaced.
    pub async fn add_rate(&self, id: Uuid, rate: DeliveryRate) -> AppResult<DeliveryCompany> {
        rate.validate()?;
        let rate = DeliveryRate {
            city: rate.city.trim().to_string(),
            cost: rate.cost,
        };

        self.modify_rates(id, |rates| {
            upsert_rate(rates, rate);
            Ok(())
        })
        .await
    }

    /// Remove the rate at `index` (position in display order)
    pub async fn remove_rate(&self, id: Uuid, index: usize) -> AppResult<DeliveryCompany> {
        self.modify_rates(id, |rates| {
            if index >= rates.len() {
                return Err(AppError::NotFound(format!("Delivery rate #{}", index)));
            }
            rates.remove(index);
            Ok(())
        })
        .await
    }

    /// Delivery cost a company charges for a city
    pub async fn quote(&self, id: Uuid, city: &str) -> AppResult<DeliveryQuote> {
        let company = self.get_delivery(id).await?;
        let rate = company
            .rate_for(city)
            .ok_or_else(|| AppError::NotFound(format!("Delivery rate for {}", city.trim())))?;
        Ok(DeliveryQuote {
            company_id: company.id,
            company: company.name.clone(),
            city: rate.city.clone(),
            cost: rate.cost,
        })
    }

    async fn modify_rates<F>(&self, id: Uuid, change: F) -> AppResult<DeliveryCompany>
    where
        F: FnOnce(&mut Vec<DeliveryRate>) -> AppResult<()>,
    {
        let mut tx = self.db.begin().await?;

        let mut company = sqlx::query_as::<_, DeliveryCompany>(
            "SELECT id, name, rates FROM delivery_config WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery company".to_string()))?;

        change(&mut company.rates)?;

        sqlx::query("UPDATE delivery_config SET rates = $2 WHERE id = $1")
            .bind(id)
            .bind(sqlx::types::Json(&company.rates))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(company_id = %id, rates = company.rates.len(), "Delivery rates updated");
        Ok(company)
    }

    // ---- Packaging ----

    pub async fn list_packaging(&self) -> AppResult<Vec<PackagingOption>> {
        let options = sqlx::query_as::<_, PackagingOption>(
            "SELECT id, name, cost FROM packaging_config ORDER BY cost, LOWER(name)",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(options)
    }

    pub async fn get_packaging(&self, id: Uuid) -> AppResult<PackagingOption> {
        sqlx::query_as::<_, PackagingOption>(
            "SELECT id, name, cost FROM packaging_config WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Packaging option".to_string()))
    }

    pub async fn create_packaging(&self, input: PackagingOptionInput) -> AppResult<PackagingOption> {
        input.validate()?;

        let option = sqlx::query_as::<_, PackagingOption>(
            "INSERT INTO packaging_config (name, cost) VALUES ($1, $2) RETURNING id, name, cost",
        )
        .bind(input.name.trim())
        .bind(input.cost)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(option_id = %option.id, "Packaging option created");
        Ok(option)
    }

    pub async fn update_packaging(
        &self,
        id: Uuid,
        input: PackagingOptionInput,
    ) -> AppResult<PackagingOption> {
        input.validate()?;

        sqlx::query_as::<_, PackagingOption>(
            "UPDATE packaging_config SET name = $2, cost = $3 WHERE id = $1 RETURNING id, name, cost",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.cost)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Packaging option".to_string()))
    }

    pub async fn delete_packaging(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM packaging_config WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Packaging option".to_string()));
        }
        tracing::info!(option_id = %id, "Packaging option deleted");
        Ok(())
    }
}

/// Replace the cost of a city already listed, otherwise append
fn upsert_rate(rates: &mut Vec<DeliveryRate>, rate: DeliveryRate) {
    let wanted = rate.city.to_lowercase();
    match rates
        .iter_mut()
        .find(|existing| existing.city.trim().to_lowercase() == wanted)
    {
        Some(existing) => existing.cost = rate.cost,
        None => rates.push(rate),
    }
}
