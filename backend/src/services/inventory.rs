//! Inventory catalogue service
//!
//! Quantities and buy prices also move through transactions; see
//! [`crate::services::transaction`].

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{InventoryItem, InventoryItemInput};

/// Inventory service for managing stocked items
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

const ITEM_COLUMNS: &str = "id, name, supplier, quantity, buy_price, sell_price, low_stock_threshold, created_at, updated_at";

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All items, alphabetically
    pub async fn list(&self) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory ORDER BY LOWER(name)",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// Items at or below their threshold, emptiest first
    pub async fn low_stock(&self) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {} FROM inventory WHERE quantity <= low_stock_threshold ORDER BY quantity, LOWER(name)",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn create(&self, input: InventoryItemInput) -> AppResult<InventoryItem> {
        input.validate()?;

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            INSERT INTO inventory (name, supplier, quantity, buy_price, sell_price, low_stock_threshold)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(blank_to_none(input.supplier.as_deref()))
        .bind(input.quantity)
        .bind(input.buy_price)
        .bind(input.sell_price)
        .bind(input.threshold_or_default())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(item_id = %item.id, name = %item.name, "Inventory item created");
        Ok(item)
    }

    /// Replace every editable field of an item
    pub async fn update(&self, id: Uuid, input: InventoryItemInput) -> AppResult<InventoryItem> {
        input.validate()?;

        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory
            SET name = $2, supplier = $3, quantity = $4, buy_price = $5, sell_price = $6,
                low_stock_threshold = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(blank_to_none(input.supplier.as_deref()))
        .bind(input.quantity)
        .bind(input.buy_price)
        .bind(input.sell_price)
        .bind(input.threshold_or_default())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        tracing::info!(item_id = %item.id, quantity = item.quantity, "Inventory item updated");
        Ok(item)
    }

    /// Delete an item. Transactions keep their history with the item cleared.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }

        tracing::info!(item_id = %id, "Inventory item deleted");
        Ok(())
    }
}

pub(crate) fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
