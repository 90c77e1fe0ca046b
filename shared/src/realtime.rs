//! Table change events and the local mirror that applies them
//!
//! Database triggers publish a small [`RowChange`] per row change. The server
//! loads the row and forwards a full [`ChangeEvent`]. A client keeps a
//! [`LiveCollection`] per table and feeds it every event it receives; the
//! collection ends up holding the same rows as the database.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AppUser, DeliveryCompany, InventoryItem, PackagingOption, Transaction};

/// Tables that publish changes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Inventory,
    Transactions,
    DeliveryConfig,
    PackagingConfig,
    Users,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Inventory,
        Table::Transactions,
        Table::DeliveryConfig,
        Table::PackagingConfig,
        Table::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Inventory => "inventory",
            Table::Transactions => "transactions",
            Table::DeliveryConfig => "delivery_config",
            Table::PackagingConfig => "packaging_config",
            Table::Users => "users",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// Notification payload published by the database trigger.
///
/// Only the row id travels over NOTIFY, whose payload must stay under 8000
/// bytes; the row itself is read back after the commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowChange {
    pub table: Table,
    pub operation: ChangeOperation,
    pub id: Uuid,
}

impl RowChange {
    /// Whether the current row must be loaded to build the event
    pub fn needs_record(&self) -> bool {
        self.operation != ChangeOperation::Delete
    }

    /// Build the event sent to clients. Deletes carry the id as `old_record`.
    pub fn into_event(self, record: Option<serde_json::Value>) -> ChangeEvent {
        let old_record = match self.operation {
            ChangeOperation::Delete => Some(serde_json::json!({ "id": self.id })),
            _ => None,
        };
        ChangeEvent {
            table: self.table,
            operation: self.operation,
            record,
            old_record,
        }
    }
}

/// One row change as forwarded to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub operation: ChangeOperation,
    /// Row after the change; absent for deletes
    #[serde(default)]
    pub record: Option<serde_json::Value>,
    /// Row before the change; absent for inserts
    #[serde(default)]
    pub old_record: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Id of the affected row, taken from whichever side is present
    pub fn row_id(&self) -> Option<Uuid> {
        self.record
            .as_ref()
            .or(self.old_record.as_ref())
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("change event has no row id")]
    MissingId,

    #[error("change event for {0:?} has no record")]
    MissingRecord(ChangeOperation),

    #[error("could not decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Rows that can be mirrored
pub trait Mirrored: DeserializeOwned + Clone {
    const TABLE: Table;

    fn key(&self) -> Uuid;
}

impl Mirrored for Transaction {
    const TABLE: Table = Table::Transactions;

    fn key(&self) -> Uuid {
        self.id
    }
}

impl Mirrored for InventoryItem {
    const TABLE: Table = Table::Inventory;

    fn key(&self) -> Uuid {
        self.id
    }
}

impl Mirrored for DeliveryCompany {
    const TABLE: Table = Table::DeliveryConfig;

    fn key(&self) -> Uuid {
        self.id
    }
}

impl Mirrored for PackagingOption {
    const TABLE: Table = Table::PackagingConfig;

    fn key(&self) -> Uuid {
        self.id
    }
}

impl Mirrored for AppUser {
    const TABLE: Table = Table::Users;

    fn key(&self) -> Uuid {
        self.id
    }
}

/// Local copy of one table
#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    rows: Vec<T>,
}

impl<T> Default for LiveCollection<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Mirrored> LiveCollection<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.rows.iter().find(|row| row.key() == id)
    }

    /// Replace the whole collection, e.g. after a fresh fetch
    pub fn reset(&mut self, rows: Vec<T>) {
        self.rows = rows;
    }

    /// Apply one event. Returns `Ok(false)` for events of other tables.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<bool, MirrorError> {
        if event.table != T::TABLE {
            return Ok(false);
        }
        match event.operation {
            ChangeOperation::Insert | ChangeOperation::Update => {
                let record = event
                    .record
                    .clone()
                    .ok_or(MirrorError::MissingRecord(event.operation))?;
                let row: T = serde_json::from_value(record)?;
                self.upsert(row);
            }
            ChangeOperation::Delete => {
                let id = event.row_id().ok_or(MirrorError::MissingId)?;
                self.rows.retain(|row| row.key() != id);
            }
        }
        Ok(true)
    }

    fn upsert(&mut self, row: T) {
        match self.rows.iter_mut().find(|existing| existing.key() == row.key()) {
            Some(existing) => *existing = row,
            None => self.rows.insert(0, row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn packaging_row(id: Uuid, name: &str, cost: &str) -> serde_json::Value {
        json!({ "id": id.to_string(), "name": name, "cost": cost })
    }

    #[test]
    fn test_insert_update_delete() {
        let id = Uuid::new_v4();
        let mut live: LiveCollection<PackagingOption> = LiveCollection::default();

        let insert = ChangeEvent {
            table: Table::PackagingConfig,
            operation: ChangeOperation::Insert,
            record: Some(packaging_row(id, "Box S", "3.50")),
            old_record: None,
        };
        assert!(live.apply(&insert).unwrap());
        assert_eq!(live.len(), 1);

        let update = ChangeEvent {
            operation: ChangeOperation::Update,
            record: Some(packaging_row(id, "Box M", "5")),
            ..insert.clone()
        };
        live.apply(&update).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live.get(id).unwrap().name, "Box M");

        let delete = ChangeEvent {
            operation: ChangeOperation::Delete,
            record: None,
            old_record: Some(packaging_row(id, "Box M", "5")),
            ..insert
        };
        live.apply(&delete).unwrap();
        assert!(live.is_empty());
    }

    #[test]
    fn test_other_tables_are_ignored() {
        let mut live: LiveCollection<PackagingOption> = LiveCollection::default();
        let event = ChangeEvent {
            table: Table::Users,
            operation: ChangeOperation::Delete,
            record: None,
            old_record: None,
        };
        assert!(!live.apply(&event).unwrap());
    }

    #[test]
    fn test_bad_row_leaves_state_untouched() {
        let id = Uuid::new_v4();
        let mut live = LiveCollection::new(vec![PackagingOption {
            id,
            name: "Bag".to_string(),
            cost: rust_decimal::Decimal::ONE,
        }]);
        let event = ChangeEvent {
            table: Table::PackagingConfig,
            operation: ChangeOperation::Update,
            record: Some(json!({ "id": id.to_string(), "name": 42 })),
            old_record: None,
        };
        assert!(matches!(live.apply(&event), Err(MirrorError::Decode(_))));
        assert_eq!(live.get(id).unwrap().name, "Bag");
    }

    #[test]
    fn test_trigger_payload_builds_events() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"table":"delivery_config","operation":"DELETE","id":"{id}"}}"#);
        let change: RowChange = serde_json::from_str(&raw).unwrap();
        assert!(!change.needs_record());

        let event = change.into_event(None);
        assert_eq!(event.row_id(), Some(id));

        let mut live = LiveCollection::new(vec![DeliveryCompany {
            id,
            name: "Amana".to_string(),
            rates: Vec::new(),
        }]);
        assert!(live.apply(&event).unwrap());
        assert!(live.is_empty());
    }

    /// Rows far larger than a NOTIFY payload still reach the mirror
    #[test]
    fn test_large_row_is_mirrored() {
        let id = Uuid::new_v4();
        let change = RowChange {
            table: Table::DeliveryConfig,
            operation: ChangeOperation::Update,
            id,
        };
        assert!(change.needs_record());

        let rates: Vec<serde_json::Value> = (0..400)
            .map(|i| json!({ "city": format!("مدينة رقم {i}"), "cost": "35.00" }))
            .collect();
        let record = json!({ "id": id.to_string(), "name": "Amana", "rates": rates });
        assert!(record.to_string().len() > 8000);

        let mut live: LiveCollection<DeliveryCompany> = LiveCollection::default();
        live.apply(&change.into_event(Some(record))).unwrap();
        assert_eq!(live.get(id).unwrap().rates.len(), 400);
    }

    #[test]
    fn test_event_wire_format() {
        let raw = r#"{"table":"transactions","operation":"DELETE","record":null,"old_record":{"id":"7f8d2c1e-4a8b-4c67-9a8e-2f1b9b1e0c11"}}"#;
        let event: ChangeEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.table, Table::Transactions);
        assert_eq!(event.operation, ChangeOperation::Delete);
        assert!(event.row_id().is_some());
    }
}
