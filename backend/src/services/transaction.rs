//! Sales, purchases and expenses
//!
//! Every write runs in one database transaction: the referenced item rows
//! are locked, the stock plan from [`shared::ledger`] is executed against
//! them, and the item and transaction rows are written before commit. A
//! failed step leaves both stock and the transaction untouched.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::inventory::blank_to_none;
use shared::ledger::{self, LedgerEntry, StockLevel};
use shared::metrics;
use shared::models::{
    DeliveryCompany, PackagingOption, Transaction, TransactionFilter, TransactionInput,
    TransactionStatus, TransactionType,
};

/// Transaction service
#[derive(Clone)]
pub struct TransactionService {
    db: PgPool,
}

const TX_COLUMNS: &str = "id, date, transaction_type, status, party, phone, address, category, item_id, quantity, amount, delivery_cost, packaging_cost, delivery_company, notes, created_at";

/// Item row as locked for a stock update
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedItem {
    pub id: Uuid,
    pub quantity: i32,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
}

/// A transaction with every default resolved, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub party: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub item_id: Option<Uuid>,
    pub quantity: i32,
    pub amount: Decimal,
    pub delivery_cost: Decimal,
    pub packaging_cost: Decimal,
    pub delivery_company: Option<String>,
    pub notes: Option<String>,
}

impl TransactionDraft {
    pub fn entry(&self) -> LedgerEntry {
        LedgerEntry {
            transaction_type: self.transaction_type,
            status: self.status,
            item_id: self.item_id,
            quantity: self.quantity,
            amount: self.amount,
        }
    }
}

/// Values already used, for autocomplete
#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub parties: Vec<String>,
    pub categories: Vec<String>,
}

/// Lookups a draft may need besides the input itself
#[derive(Debug, Default)]
pub struct DraftContext<'a> {
    pub item: Option<&'a LockedItem>,
    pub delivery: Option<&'a DeliveryCompany>,
    pub packaging: Option<&'a PackagingOption>,
    /// Status kept when the input leaves it out; `None` on create
    pub current_status: Option<TransactionStatus>,
    pub today: Option<NaiveDate>,
}

/// Resolve the defaults of an input: today's date, the type's default
/// status, unit price from the item, delivery cost from a company rate and
/// packaging cost from an option.
pub fn draft_from_input(input: &TransactionInput, ctx: &DraftContext<'_>) -> AppResult<TransactionDraft> {
    let kind = input.transaction_type;
    let quantity = input.quantity_or_default();
    let item_id = if kind.moves_stock() { input.item_id } else { None };

    if item_id.is_some() {
        shared::validation::check_quantity(quantity).map_err(|_| {
            AppError::invalid(
                "quantity",
                "Quantity must be between 1 and 1,000,000",
                "La quantité doit être comprise entre 1 et 1 000 000",
                "يجب أن تكون الكمية بين 1 و 1000000",
            )
        })?;
        if ctx.item.is_none() {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }
    }

    let unit = match (input.unit_amount, ctx.item.filter(|_| item_id.is_some())) {
        (Some(unit), _) => unit,
        (None, Some(item)) if kind == TransactionType::Sale => item.sell_price,
        (None, Some(item)) => item.buy_price,
        (None, None) => {
            return Err(AppError::invalid(
                "unit_amount",
                "Amount is required",
                "Le montant est obligatoire",
                "المبلغ مطلوب",
            ))
        }
    };
    let amount = unit
        .checked_mul(Decimal::from(quantity))
        .filter(|total| shared::validation::check_money(*total).is_ok())
        .ok_or_else(|| {
            AppError::invalid(
                "amount",
                "Line total is too large",
                "Le total de la ligne est trop élevé",
                "إجمالي السطر كبير جدًا",
            )
        })?;

    let is_sale = kind == TransactionType::Sale;

    let (delivery_cost, delivery_company) = match (input.delivery_company_id, ctx.delivery) {
        _ if !is_sale => (Decimal::ZERO, None),
        (Some(_), Some(company)) => {
            let city = input.delivery_city.as_deref().unwrap_or_default();
            let rate = company.rate_for(city).ok_or_else(|| {
                AppError::invalid(
                    "delivery_city",
                    "This company does not deliver to that city",
                    "Cette société ne livre pas dans cette ville",
                    "شركة التوصيل لا تخدم هذه المدينة",
                )
            })?;
            (rate.cost, Some(company.name.clone()))
        }
        (Some(_), None) => return Err(AppError::NotFound("Delivery company".to_string())),
        (None, _) => (input.delivery_cost.unwrap_or(Decimal::ZERO), None),
    };

    let packaging_cost = match (input.packaging_option_id, ctx.packaging) {
        _ if !is_sale => Decimal::ZERO,
        (Some(_), Some(option)) => option.cost,
        (Some(_), None) => return Err(AppError::NotFound("Packaging option".to_string())),
        (None, _) => input.packaging_cost.unwrap_or(Decimal::ZERO),
    };

    let status = input
        .status
        .or(ctx.current_status)
        .unwrap_or_else(|| kind.default_status());

    Ok(TransactionDraft {
        date: input
            .date
            .or(ctx.today)
            .unwrap_or_else(|| Utc::now().date_naive()),
        transaction_type: kind,
        status,
        party: input.party.trim().to_string(),
        phone: blank_to_none(input.phone.as_deref()).map(str::to_string),
        address: blank_to_none(input.address.as_deref()).map(str::to_string),
        category: blank_to_none(input.category.as_deref()).map(str::to_string),
        item_id,
        quantity,
        amount,
        delivery_cost,
        packaging_cost,
        delivery_company,
        notes: blank_to_none(input.notes.as_deref()).map(str::to_string),
    })
}

impl TransactionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Newest first
    pub async fn list(&self, filter: &TransactionFilter) -> AppResult<Vec<Transaction>> {
        if !filter.date_range().is_valid() {
            return Err(AppError::invalid(
                "start",
                "Start date is after end date",
                "La date de début est après la date de fin",
                "تاريخ البداية بعد تاريخ النهاية",
            ));
        }

        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
              AND ($3::transaction_type IS NULL OR transaction_type = $3)
              AND ($4::transaction_status IS NULL OR status = $4)
            ORDER BY date DESC, created_at DESC
            "#,
            TX_COLUMNS
        ))
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.transaction_type)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TX_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))
    }

    pub async fn suggestions(&self) -> AppResult<Suggestions> {
        let rows = self.list(&TransactionFilter::default()).await?;
        Ok(Suggestions {
            parties: metrics::distinct_parties(&rows),
            categories: metrics::distinct_categories(&rows),
        })
    }

    pub async fn create(&self, input: TransactionInput) -> AppResult<Transaction> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let items = lock_items(&mut tx, stock_item(&input).into_iter().collect()).await?;
        let draft = resolve(&mut tx, &input, &items, None).await?;
        apply_stock(&mut tx, &items, None, Some(&draft.entry())).await?;

        let created = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (date, transaction_type, status, party, phone, address, category,
                item_id, quantity, amount, delivery_cost, packaging_cost, delivery_company, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            TX_COLUMNS
        ))
        .bind(draft.date)
        .bind(draft.transaction_type)
        .bind(draft.status)
        .bind(&draft.party)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(&draft.category)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.amount)
        .bind(draft.delivery_cost)
        .bind(draft.packaging_cost)
        .bind(&draft.delivery_company)
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = %created.id,
            kind = %created.transaction_type,
            status = %created.status,
            amount = %created.amount,
            "Transaction created"
        );
        Ok(created)
    }

    /// Replace a transaction, moving stock from its old effect to its new one
    pub async fn update(&self, id: Uuid, input: TransactionInput) -> AppResult<Transaction> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let existing = lock_transaction(&mut tx, id).await?;
        let ids = existing.item_id.into_iter().chain(stock_item(&input)).collect();
        let items = lock_items(&mut tx, ids).await?;
        let draft = resolve(&mut tx, &input, &items, Some(existing.status)).await?;
        apply_stock(
            &mut tx,
            &items,
            Some(&LedgerEntry::from(&existing)),
            Some(&draft.entry()),
        )
        .await?;

        let updated = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET date = $2, transaction_type = $3, status = $4, party = $5, phone = $6,
                address = $7, category = $8, item_id = $9, quantity = $10, amount = $11,
                delivery_cost = $12, packaging_cost = $13, delivery_company = $14, notes = $15
            WHERE id = $1
            RETURNING {}
            "#,
            TX_COLUMNS
        ))
        .bind(id)
        .bind(draft.date)
        .bind(draft.transaction_type)
        .bind(draft.status)
        .bind(&draft.party)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(&draft.category)
        .bind(draft.item_id)
        .bind(draft.quantity)
        .bind(draft.amount)
        .bind(draft.delivery_cost)
        .bind(draft.packaging_cost)
        .bind(&draft.delivery_company)
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = %id, "Transaction updated");
        Ok(updated)
    }

    /// Move a transaction to any status
    pub async fn set_status(&self, id: Uuid, status: TransactionStatus) -> AppResult<Transaction> {
        let mut tx = self.db.begin().await?;

        let existing = lock_transaction(&mut tx, id).await?;
        if existing.status == status {
            return Ok(existing);
        }

        let items = lock_items(&mut tx, existing.item_id.into_iter().collect()).await?;
        let old = LedgerEntry::from(&existing);
        let new = LedgerEntry { status, ..old };
        apply_stock(&mut tx, &items, Some(&old), Some(&new)).await?;

        let updated = sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING {}",
            TX_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = %id,
            from = %existing.status,
            to = %status,
            "Transaction status changed"
        );
        Ok(updated)
    }

    /// Delete a transaction and undo its stock effect
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let existing = lock_transaction(&mut tx, id).await?;
        let items = lock_items(&mut tx, existing.item_id.into_iter().collect()).await?;
        apply_stock(&mut tx, &items, Some(&LedgerEntry::from(&existing)), None).await?;

        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = %id, "Transaction deleted");
        Ok(())
    }
}

/// The item an input would move stock on
fn stock_item(input: &TransactionInput) -> Option<Uuid> {
    input
        .item_id
        .filter(|_| input.transaction_type.moves_stock())
}

async fn lock_transaction(conn: &mut PgConnection, id: Uuid) -> AppResult<Transaction> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {} FROM transactions WHERE id = $1 FOR UPDATE",
        TX_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Transaction".to_string()))
}

/// Lock item rows in id order
async fn lock_items(conn: &mut PgConnection, mut ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, LockedItem>> {
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, LockedItem>(
        "SELECT id, quantity, buy_price, sell_price FROM inventory WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

/// Load the delivery company and packaging option an input refers to, then
/// build the draft
async fn resolve(
    conn: &mut PgConnection,
    input: &TransactionInput,
    items: &HashMap<Uuid, LockedItem>,
    current_status: Option<TransactionStatus>,
) -> AppResult<TransactionDraft> {
    let delivery = match input.delivery_company_id {
        Some(id) => {
            sqlx::query_as::<_, DeliveryCompany>(
                "SELECT id, name, rates FROM delivery_config WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    let packaging = match input.packaging_option_id {
        Some(id) => {
            sqlx::query_as::<_, PackagingOption>(
                "SELECT id, name, cost FROM packaging_config WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    let ctx = DraftContext {
        item: stock_item(input).and_then(|id| items.get(&id)),
        delivery: delivery.as_ref(),
        packaging: packaging.as_ref(),
        current_status,
        today: None,
    };
    draft_from_input(input, &ctx)
}

/// Run the stock plan between two states and write back the items it changed
async fn apply_stock(
    conn: &mut PgConnection,
    items: &HashMap<Uuid, LockedItem>,
    old: Option<&LedgerEntry>,
    new: Option<&LedgerEntry>,
) -> AppResult<()> {
    let steps = ledger::plan(old, new);
    if steps.is_empty() {
        return Ok(());
    }

    let before: HashMap<Uuid, StockLevel> = items
        .values()
        .map(|item| (item.id, StockLevel::new(item.quantity, item.buy_price)))
        .collect();
    let mut after = before.clone();

    if let Err(err) = ledger::execute(&steps, &mut after) {
        tracing::warn!(error = %err, "Stock update refused");
        return Err(err.into());
    }

    for (id, level) in &after {
        if before.get(id) == Some(level) {
            continue;
        }
        sqlx::query(
            "UPDATE inventory SET quantity = $2, buy_price = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(level.quantity)
        .bind(level.buy_price)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(item_id = %id, quantity = level.quantity, buy_price = %level.buy_price, "Stock moved");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DeliveryRate;
    use std::str::FromStr;

    fn input(kind: TransactionType) -> TransactionInput {
        TransactionInput {
            date: None,
            transaction_type: kind,
            status: None,
            party: " Nadia ".to_string(),
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

    fn item() -> LockedItem {
        LockedItem {
            id: Uuid::new_v4(),
            quantity: 10,
            buy_price: Decimal::from(60),
            sell_price: Decimal::from(100),
        }
    }

    #[test]
    fn test_sale_defaults_to_sell_price() {
        let item = item();
        let mut sale = input(TransactionType::Sale);
        sale.item_id = Some(item.id);
        sale.quantity = Some(3);
        let ctx = DraftContext {
            item: Some(&item),
            ..Default::default()
        };
        let draft = draft_from_input(&sale, &ctx).unwrap();
        assert_eq!(draft.amount, Decimal::from(300));
        assert_eq!(draft.status, TransactionStatus::Pending);
        assert_eq!(draft.party, "Nadia");
    }

    #[test]
    fn test_purchase_defaults_to_buy_price() {
        let item = item();
        let mut purchase = input(TransactionType::Purchase);
        purchase.item_id = Some(item.id);
        let ctx = DraftContext {
            item: Some(&item),
            ..Default::default()
        };
        let draft = draft_from_input(&purchase, &ctx).unwrap();
        assert_eq!(draft.amount, Decimal::from(60));
        assert_eq!(draft.quantity, 1);
        assert_eq!(draft.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_expense_needs_amount_and_drops_item() {
        let mut expense = input(TransactionType::Expense);
        expense.item_id = Some(Uuid::new_v4());
        assert!(matches!(
            draft_from_input(&expense, &DraftContext::default()),
            Err(AppError::Validation { .. })
        ));

        expense.unit_amount = Some(Decimal::from(250));
        let draft = draft_from_input(&expense, &DraftContext::default()).unwrap();
        assert_eq!(draft.item_id, None);
        assert_eq!(draft.amount, Decimal::from(250));
    }

    #[test]
    fn test_delivery_rate_and_packaging_resolved() {
        let company = DeliveryCompany {
            id: Uuid::new_v4(),
            name: "Amana".to_string(),
            rates: vec![DeliveryRate {
                city: "Marrakech".to_string(),
                cost: Decimal::from(35),
            }],
        };
        let packaging = PackagingOption {
            id: Uuid::new_v4(),
            name: "Box".to_string(),
            cost: Decimal::from_str("4.50").unwrap(),
        };
        let mut sale = input(TransactionType::Sale);
        sale.unit_amount = Some(Decimal::from(120));
        sale.delivery_company_id = Some(company.id);
        sale.delivery_city = Some("marrakech".to_string());
        sale.delivery_cost = Some(Decimal::from(999));
        sale.packaging_option_id = Some(packaging.id);
        let ctx = DraftContext {
            delivery: Some(&company),
            packaging: Some(&packaging),
            ..Default::default()
        };
        let draft = draft_from_input(&sale, &ctx).unwrap();
        assert_eq!(draft.delivery_cost, Decimal::from(35));
        assert_eq!(draft.delivery_company.as_deref(), Some("Amana"));
        assert_eq!(draft.packaging_cost, Decimal::from_str("4.50").unwrap());

        sale.delivery_city = Some("Tanger".to_string());
        assert!(draft_from_input(&sale, &ctx).is_err());
    }

    #[test]
    fn test_update_keeps_current_status() {
        let mut expense = input(TransactionType::Expense);
        expense.unit_amount = Some(Decimal::ONE);
        let ctx = DraftContext {
            current_status: Some(TransactionStatus::Pending),
            ..Default::default()
        };
        let draft = draft_from_input(&expense, &ctx).unwrap();
        assert_eq!(draft.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let mut sale = input(TransactionType::Sale);
        sale.item_id = Some(Uuid::new_v4());
        assert!(matches!(
            draft_from_input(&sale, &DraftContext::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_shipping_only_on_sales() {
        let mut purchase = input(TransactionType::Purchase);
        purchase.unit_amount = Some(Decimal::from(10));
        purchase.delivery_cost = Some(Decimal::from(20));
        let draft = draft_from_input(&purchase, &DraftContext::default()).unwrap();
        assert_eq!(draft.delivery_cost, Decimal::ZERO);
    }

    #[test]
    fn test_line_total_past_money_limit_is_rejected() {
        let mut expense = input(TransactionType::Expense);
        expense.unit_amount = Some(shared::validation::MAX_MONEY);
        expense.quantity = Some(2);
        assert!(matches!(
            draft_from_input(&expense, &DraftContext::default()),
            Err(AppError::Validation { ref field, .. }) if field == "amount"
        ));

        expense.unit_amount = Some(Decimal::MAX);
        assert!(draft_from_input(&expense, &DraftContext::default()).is_err());

        expense.quantity = Some(1);
        expense.unit_amount = Some(shared::validation::MAX_MONEY);
        assert!(draft_from_input(&expense, &DraftContext::default()).is_ok());
    }

    #[test]
    fn test_quantity_past_limit_is_rejected() {
        let item = item();
        let mut purchase = input(TransactionType::Purchase);
        purchase.item_id = Some(item.id);
        purchase.quantity = Some(i32::MAX);
        let ctx = DraftContext {
            item: Some(&item),
            ..Default::default()
        };
        assert!(matches!(
            draft_from_input(&purchase, &ctx),
            Err(AppError::Validation { ref field, .. }) if field == "quantity"
        ));
        assert!(purchase.validate().is_err());
    }
}
