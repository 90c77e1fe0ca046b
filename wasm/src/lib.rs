//! WebAssembly module for BizManager
//!
//! Provides client-side computation for:
//! - Mirroring tables from the realtime change stream
//! - Dashboard metrics over the mirrored rows
//! - Line totals, average cost and currency formatting
//! - Form validation before anything is sent

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::ledger;
use shared::metrics::{self, FinancialSummary, RECENT_LIMIT};
use shared::models::{
    DeliveryCompany, InventoryItem, PackagingOption, Transaction, TransactionFilter,
};
use shared::realtime::{ChangeEvent, LiveCollection, Table};

// Re-export shared types for use in JavaScript
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("bizmanager-wasm loaded"));
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid amount {:?}: {}", value, e))
}

fn parse_table(name: &str) -> Result<Table, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("Unknown table: {}", name))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct DashboardView<'a> {
    #[serde(flatten)]
    summary: FinancialSummary,
    inventory_value: Decimal,
    item_count: usize,
    low_stock: Vec<&'a InventoryItem>,
    recent: Vec<&'a Transaction>,
}

/// Local copy of the tables the dashboard shows, kept current by feeding it
/// the events received on the realtime socket
#[wasm_bindgen]
#[derive(Default)]
pub struct DashboardStore {
    transactions: LiveCollection<Transaction>,
    inventory: LiveCollection<InventoryItem>,
    delivery: LiveCollection<DeliveryCompany>,
    packaging: LiveCollection<PackagingOption>,
}

impl DashboardStore {
    fn load_rows(&mut self, table: &str, rows_json: &str) -> Result<usize, String> {
        let decode = |e: serde_json::Error| format!("Invalid {} rows: {}", table, e);
        let count = match parse_table(table)? {
            Table::Transactions => {
                self.transactions.reset(serde_json::from_str(rows_json).map_err(decode)?);
                self.transactions.len()
            }
            Table::Inventory => {
                self.inventory.reset(serde_json::from_str(rows_json).map_err(decode)?);
                self.inventory.len()
            }
            Table::DeliveryConfig => {
                self.delivery.reset(serde_json::from_str(rows_json).map_err(decode)?);
                self.delivery.len()
            }
            Table::PackagingConfig => {
                self.packaging.reset(serde_json::from_str(rows_json).map_err(decode)?);
                self.packaging.len()
            }
            Table::Users => return Err("Users are not mirrored on the dashboard".to_string()),
        };
        Ok(count)
    }

    fn apply_event(&mut self, event: &ChangeEvent) -> Result<bool, String> {
        let applied = match event.table {
            Table::Transactions => self.transactions.apply(event),
            Table::Inventory => self.inventory.apply(event),
            Table::DeliveryConfig => self.delivery.apply(event),
            Table::PackagingConfig => self.packaging.apply(event),
            Table::Users => Ok(false),
        };
        applied.map_err(|e| e.to_string())
    }

    fn dashboard(&self, filter: &TransactionFilter) -> Result<String, String> {
        if !filter.date_range().is_valid() {
            return Err("Start date is after end date".to_string());
        }
        let rows = metrics::filter(self.transactions.rows(), filter);
        let items = self.inventory.rows();
        to_json(&DashboardView {
            summary: metrics::summarize(rows.iter().copied()),
            inventory_value: metrics::inventory_value(items),
            item_count: items.len(),
            low_stock: metrics::low_stock(items),
            recent: metrics::recent(rows.iter().copied(), RECENT_LIMIT),
        })
    }

    fn filtered(&self, filter: &TransactionFilter) -> Result<String, String> {
        let mut rows = metrics::filter(self.transactions.rows(), filter);
        metrics::newest_first(&mut rows);
        to_json(&rows)
    }
}

fn parse_filter(filter_json: &str) -> Result<TransactionFilter, String> {
    if filter_json.trim().is_empty() {
        return Ok(TransactionFilter::default());
    }
    serde_json::from_str(filter_json).map_err(|e| format!("Invalid filter JSON: {}", e))
}

#[wasm_bindgen]
impl DashboardStore {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a table with a fresh fetch; returns the row count
    pub fn load(&mut self, table: &str, rows_json: &str) -> Result<usize, JsValue> {
        self.load_rows(table, rows_json).map_err(js_error)
    }

    /// Apply one change message from the socket. Returns whether it touched
    /// a mirrored table.
    #[wasm_bindgen(js_name = applyChange)]
    pub fn apply_change(&mut self, event_json: &str) -> Result<bool, JsValue> {
        let event: ChangeEvent = serde_json::from_str(event_json)
            .map_err(|e| js_error(format!("Invalid change event: {}", e)))?;
        self.apply_event(&event).map_err(|e| {
            web_sys::console::warn_1(&JsValue::from_str(&e));
            js_error(e)
        })
    }

    /// Dashboard metrics for an optional `{start, end, type, status}` filter
    #[wasm_bindgen(js_name = dashboardJson)]
    pub fn dashboard_json(&self, filter_json: &str) -> Result<String, JsValue> {
        parse_filter(filter_json)
            .and_then(|filter| self.dashboard(&filter))
            .map_err(js_error)
    }

    /// Matching transactions, newest first
    #[wasm_bindgen(js_name = transactionsJson)]
    pub fn transactions_json(&self, filter_json: &str) -> Result<String, JsValue> {
        parse_filter(filter_json)
            .and_then(|filter| self.filtered(&filter))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = lowStockJson)]
    pub fn low_stock_json(&self) -> Result<String, JsValue> {
        to_json(&metrics::low_stock(self.inventory.rows())).map_err(js_error)
    }

    /// Known parties and categories for autocomplete
    #[wasm_bindgen(js_name = suggestionsJson)]
    pub fn suggestions_json(&self) -> Result<String, JsValue> {
        let rows = self.transactions.rows();
        to_json(&serde_json::json!({
            "parties": metrics::distinct_parties(rows),
            "categories": metrics::distinct_categories(rows),
        }))
        .map_err(js_error)
    }

    /// Delivery cost of a company for a city, or `undefined` when the city
    /// has no rate
    #[wasm_bindgen(js_name = deliveryCost)]
    pub fn delivery_cost(&self, company_id: &str, city: &str) -> Option<String> {
        self.delivery
            .rows()
            .iter()
            .find(|company| company.id.to_string() == company_id)
            .and_then(|company| company.rate_for(city))
            .map(|rate| rate.cost.to_string())
    }
}

/// Format an amount as `MAD 1,234.50`
#[wasm_bindgen]
pub fn format_mad(amount: &str) -> Result<String, JsValue> {
    parse_decimal(amount)
        .map(shared::format_currency)
        .map_err(js_error)
}

/// Unit amount times quantity
#[wasm_bindgen]
pub fn line_amount(unit_amount: &str, quantity: i32) -> Result<String, JsValue> {
    calculate_line_amount(unit_amount, quantity).map_err(js_error)
}

fn calculate_line_amount(unit_amount: &str, quantity: i32) -> Result<String, String> {
    check_quantity(quantity)?;
    let unit = parse_decimal(unit_amount)?;
    check_money(unit)?;
    unit.checked_mul(Decimal::from(quantity))
        .filter(|total| check_money(*total).is_ok())
        .map(|total| total.to_string())
        .ok_or_else(|| "Line total is too large".to_string())
}

/// Buy price after a purchase, for previewing it before saving
#[wasm_bindgen]
pub fn weighted_average_cost(
    current_qty: i32,
    current_cost: &str,
    incoming_qty: i32,
    incoming_cost: &str,
) -> Result<String, JsValue> {
    preview_average_cost(current_qty, current_cost, incoming_qty, incoming_cost).map_err(js_error)
}

fn preview_average_cost(
    current_qty: i32,
    current_cost: &str,
    incoming_qty: i32,
    incoming_cost: &str,
) -> Result<String, String> {
    check_quantity(incoming_qty)?;
    let current = parse_decimal(current_cost)?;
    let incoming = parse_decimal(incoming_cost)?;
    ledger::weighted_average_cost(current_qty, current, incoming_qty, incoming)
        .map(|cost| cost.to_string())
        .ok_or_else(|| "Cost is out of range".to_string())
}

#[wasm_bindgen]
pub fn validate_pin_code(pin: &str) -> bool {
    check_pin(pin).is_ok()
}

/// Empty input counts as "no phone"
#[wasm_bindgen]
pub fn validate_phone_number(phone: &str) -> bool {
    phone.trim().is_empty() || check_moroccan_phone(phone).is_ok()
}
