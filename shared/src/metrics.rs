//! Dashboard and report reductions over in-memory rows
//!
//! Counting rules:
//! - income is the amount of completed sales;
//! - expenses are completed purchases and expenses, plus the delivery and
//!   packaging of every sale that was shipped (completed or refused);
//! - pending transactions only show up in the pending counters.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    InventoryItem, Transaction, TransactionFilter, TransactionStatus, TransactionType,
};

/// Number of rows shown in the "recent activity" list
pub const RECENT_LIMIT: usize = 5;

/// Headline numbers of the dashboard and the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    pub shipping_costs: Decimal,
    pub pending_sales_count: usize,
    pub pending_sales_value: Decimal,
    pub completed_sales_count: usize,
    pub refused_sales_count: usize,
    pub transaction_count: usize,
}

/// Totals for one category or type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub key: String,
    pub count: usize,
    pub total: Decimal,
}

/// Income a single transaction contributes
pub fn income_of(tx: &Transaction) -> Decimal {
    match (tx.transaction_type, tx.status) {
        (TransactionType::Sale, TransactionStatus::Completed) => tx.amount,
        _ => Decimal::ZERO,
    }
}

/// Expense a single transaction contributes
pub fn expense_of(tx: &Transaction) -> Decimal {
    match (tx.transaction_type, tx.status) {
        (TransactionType::Purchase | TransactionType::Expense, TransactionStatus::Completed) => {
            tx.amount
        }
        (TransactionType::Sale, TransactionStatus::Completed | TransactionStatus::Refused) => {
            tx.shipping_cost()
        }
        _ => Decimal::ZERO,
    }
}

pub fn summarize<'a, I>(transactions: I) -> FinancialSummary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut summary = FinancialSummary::default();
    for tx in transactions {
        summary.transaction_count += 1;
        summary.total_income += income_of(tx);
        summary.total_expenses += expense_of(tx);

        if tx.transaction_type != TransactionType::Sale {
            continue;
        }
        match tx.status {
            TransactionStatus::Pending => {
                summary.pending_sales_count += 1;
                summary.pending_sales_value += tx.amount;
            }
            TransactionStatus::Completed => {
                summary.completed_sales_count += 1;
                summary.shipping_costs += tx.shipping_cost();
            }
            TransactionStatus::Refused => {
                summary.refused_sales_count += 1;
                summary.shipping_costs += tx.shipping_cost();
            }
        }
    }
    summary.net_profit = summary.total_income - summary.total_expenses;
    summary
}

/// Value of all stock at buy price
pub fn inventory_value<'a, I>(items: I) -> Decimal
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    items.into_iter().map(InventoryItem::stock_value).sum()
}

pub fn low_stock<'a, I>(items: I) -> Vec<&'a InventoryItem>
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    items.into_iter().filter(|item| item.is_low_stock()).collect()
}

/// Sort newest first, by date then creation time
pub fn newest_first(transactions: &mut [&Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

/// The `limit` newest transactions
pub fn recent<'a, I>(transactions: I, limit: usize) -> Vec<&'a Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut sorted: Vec<&Transaction> = transactions.into_iter().collect();
    newest_first(&mut sorted);
    sorted.truncate(limit);
    sorted
}

pub fn filter<'a>(transactions: &'a [Transaction], filter: &TransactionFilter) -> Vec<&'a Transaction> {
    transactions.iter().filter(|tx| filter.matches(tx)).collect()
}

/// Distinct non-empty parties, for autocomplete
pub fn distinct_parties(transactions: &[Transaction]) -> Vec<String> {
    distinct(transactions.iter().map(|tx| Some(tx.party.as_str())))
}

/// Distinct non-empty categories, for autocomplete
pub fn distinct_categories(transactions: &[Transaction]) -> Vec<String> {
    distinct(transactions.iter().map(|tx| tx.category.as_deref()))
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Completed expenses grouped by category; blank categories are "other"
pub fn expenses_by_category<'a, I>(transactions: I) -> Vec<BreakdownLine>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    group(
        transactions
            .into_iter()
            .filter(|tx| tx.transaction_type == TransactionType::Expense)
            .filter(|tx| tx.status == TransactionStatus::Completed),
        |tx| {
            tx.category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or("other")
                .to_string()
        },
        |tx| tx.amount,
    )
}

/// Gross amounts grouped by transaction type, refused rows excluded
pub fn totals_by_type<'a, I>(transactions: I) -> Vec<BreakdownLine>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    group(
        transactions
            .into_iter()
            .filter(|tx| tx.status != TransactionStatus::Refused),
        |tx| tx.transaction_type.as_str().to_string(),
        |tx| tx.amount,
    )
}

fn group<'a>(
    rows: impl Iterator<Item = &'a Transaction>,
    key: impl Fn(&Transaction) -> String,
    value: impl Fn(&Transaction) -> Decimal,
) -> Vec<BreakdownLine> {
    let mut groups: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
    for tx in rows {
        let entry = groups.entry(key(tx)).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += value(tx);
    }
    groups
        .into_iter()
        .map(|(key, (count, total))| BreakdownLine { key, count, total })
        .collect()
}
