//! Reporting service for the dashboard, period reports and data export

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::{InventoryService, TransactionService};
use shared::i18n::{self, Language};
use shared::metrics::{self, BreakdownLine, FinancialSummary, RECENT_LIMIT};
use shared::models::{InventoryItem, Transaction, TransactionFilter};
use shared::types::DateRange;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    #[serde(flatten)]
    pub summary: FinancialSummary,
    pub inventory_value: Decimal,
    pub item_count: usize,
    pub low_stock: Vec<InventoryItem>,
    pub recent: Vec<Transaction>,
}

/// Report filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportFilter {
    fn transaction_filter(&self) -> TransactionFilter {
        TransactionFilter {
            start: self.start,
            end: self.end,
            ..Default::default()
        }
    }
}

/// Financial report for a period
#[derive(Debug, Serialize)]
pub struct PeriodReport {
    pub period: DateRange,
    #[serde(flatten)]
    pub summary: FinancialSummary,
    pub expenses_by_category: Vec<BreakdownLine>,
    pub totals_by_type: Vec<BreakdownLine>,
}

/// Plain-text summary ready to paste into a message
#[derive(Debug, Serialize)]
pub struct ShareText {
    pub language: Language,
    pub text: String,
}

/// One CSV line per transaction
#[derive(Debug, Serialize)]
struct TransactionExportRow<'a> {
    date: NaiveDate,
    #[serde(rename = "type")]
    kind: &'static str,
    status: &'static str,
    party: &'a str,
    phone: &'a str,
    address: &'a str,
    category: &'a str,
    quantity: i32,
    amount: Decimal,
    delivery_cost: Decimal,
    packaging_cost: Decimal,
    delivery_company: &'a str,
    notes: &'a str,
}

impl<'a> From<&'a Transaction> for TransactionExportRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            date: tx.date,
            kind: tx.transaction_type.as_str(),
            status: tx.status.as_str(),
            party: &tx.party,
            phone: tx.phone.as_deref().unwrap_or_default(),
            address: tx.address.as_deref().unwrap_or_default(),
            category: tx.category.as_deref().unwrap_or_default(),
            quantity: tx.quantity,
            amount: tx.amount,
            delivery_cost: tx.delivery_cost,
            packaging_cost: tx.packaging_cost,
            delivery_company: tx.delivery_company.as_deref().unwrap_or_default(),
            notes: tx.notes.as_deref().unwrap_or_default(),
        }
    }
}

/// One CSV line per item
#[derive(Debug, Serialize)]
struct InventoryExportRow<'a> {
    name: &'a str,
    supplier: &'a str,
    quantity: i32,
    buy_price: Decimal,
    sell_price: Decimal,
    stock_value: Decimal,
    low_stock: bool,
}

impl<'a> From<&'a InventoryItem> for InventoryExportRow<'a> {
    fn from(item: &'a InventoryItem) -> Self {
        Self {
            name: &item.name,
            supplier: item.supplier.as_deref().unwrap_or_default(),
            quantity: item.quantity,
            buy_price: item.buy_price,
            sell_price: item.sell_price,
            stock_value: item.stock_value(),
            low_stock: item.is_low_stock(),
        }
    }
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Headline numbers over every transaction, with stock alerts
    pub async fn dashboard(&self) -> AppResult<DashboardMetrics> {
        let transactions = TransactionService::new(self.db.clone())
            .list(&TransactionFilter::default())
            .await?;
        let items = InventoryService::new(self.db.clone()).list().await?;
        Ok(build_dashboard(&transactions, &items))
    }

    pub async fn period_report(&self, filter: &ReportFilter) -> AppResult<PeriodReport> {
        let transactions = TransactionService::new(self.db.clone())
            .list(&filter.transaction_filter())
            .await?;
        Ok(build_report(DateRange::new(filter.start, filter.end), &transactions))
    }

    pub async fn share_text(&self, filter: &ReportFilter, language: Language) -> AppResult<ShareText> {
        let report = self.period_report(filter).await?;
        Ok(ShareText {
            language,
            text: i18n::report_share_text(&report.summary, language),
        })
    }

    pub async fn export_transactions(&self, filter: &TransactionFilter) -> AppResult<String> {
        let transactions = TransactionService::new(self.db.clone()).list(filter).await?;
        let rows: Vec<TransactionExportRow> = transactions.iter().map(Into::into).collect();
        Self::export_to_csv(&rows)
    }

    pub async fn export_inventory(&self) -> AppResult<String> {
        let items = InventoryService::new(self.db.clone()).list().await?;
        let rows: Vec<InventoryExportRow> = items.iter().map(Into::into).collect();
        Self::export_to_csv(&rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

pub fn build_dashboard(transactions: &[Transaction], items: &[InventoryItem]) -> DashboardMetrics {
    DashboardMetrics {
        summary: metrics::summarize(transactions),
        inventory_value: metrics::inventory_value(items),
        item_count: items.len(),
        low_stock: metrics::low_stock(items).into_iter().cloned().collect(),
        recent: metrics::recent(transactions, RECENT_LIMIT)
            .into_iter()
            .cloned()
            .collect(),
    }
}

pub fn build_report(period: DateRange, transactions: &[Transaction]) -> PeriodReport {
    PeriodReport {
        period,
        summary: metrics::summarize(transactions),
        expenses_by_category: metrics::expenses_by_category(transactions),
        totals_by_type: metrics::totals_by_type(transactions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::{TransactionStatus, TransactionType};
    use uuid::Uuid;

    fn sale(amount: i64) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            transaction_type: TransactionType::Sale,
            status: TransactionStatus::Completed,
            party: "Client, \"VIP\"".to_string(),
            phone: Some("0612345678".to_string()),
            address: None,
            category: None,
            item_id: None,
            quantity: 1,
            amount: Decimal::from(amount),
            delivery_cost: Decimal::ZERO,
            packaging_cost: Decimal::ZERO,
            delivery_company: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_transaction_csv_quotes_fields() {
        let tx = sale(150);
        let rows = vec![TransactionExportRow::from(&tx)];
        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,type,status,party,phone,address,category,quantity,amount,delivery_cost,packaging_cost,delivery_company,notes"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-06-01,sale,completed,\"Client, \"\"VIP\"\"\",0612345678,,,1,150,0,0,,"
        );
    }

    #[test]
    fn test_dashboard_limits_recent() {
        let rows: Vec<Transaction> = (0..8).map(sale).collect();
        let dashboard = build_dashboard(&rows, &[]);
        assert_eq!(dashboard.recent.len(), RECENT_LIMIT);
        assert_eq!(dashboard.summary.total_income, Decimal::from(28));
        assert_eq!(dashboard.inventory_value, Decimal::ZERO);
    }

    #[test]
    fn test_report_serializes_flat_summary() {
        let rows = vec![sale(10)];
        let report = build_report(DateRange::default(), &rows);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_income"], "10");
        assert_eq!(json["totals_by_type"][0]["key"], "sale");
    }
}
