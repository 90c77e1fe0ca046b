//! Table change fan-out
//!
//! Database triggers publish the table, operation and id of every row change
//! on a NOTIFY channel. One listener task loads the changed row, builds a
//! [`ChangeEvent`] and broadcasts it to every connected socket.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RealtimeConfig;
use shared::realtime::{ChangeEvent, RowChange, Table};

pub type EventProducer = broadcast::Sender<Arc<ChangeEvent>>;

pub fn create_event_bus(buffer: usize) -> EventProducer {
    let (sender, _) = broadcast::channel(buffer);
    sender
}

/// Messages a client may send on the socket
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Limit the stream to these tables; an empty list means all
    Subscribe { tables: Vec<Table> },
}

/// Messages the server sends on the socket
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { tables: Vec<Table> },
    Change(Arc<ChangeEvent>),
    /// Events were dropped; the client should refetch
    Lagged { skipped: u64 },
}

/// Tables a socket wants to hear about
#[derive(Debug, Clone)]
pub struct Subscription {
    tables: HashSet<Table>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            tables: Table::ALL.into_iter().collect(),
        }
    }
}

impl Subscription {
    pub fn set(&mut self, tables: Vec<Table>) {
        self.tables = if tables.is_empty() {
            Table::ALL.into_iter().collect()
        } else {
            tables.into_iter().collect()
        };
    }

    pub fn wants(&self, event: &ChangeEvent) -> bool {
        self.tables.contains(&event.table)
    }

    /// Subscribed tables in a stable order
    pub fn tables(&self) -> Vec<Table> {
        Table::ALL
            .into_iter()
            .filter(|t| self.tables.contains(t))
            .collect()
    }
}

/// Listens for database notifications and republishes them
pub struct RealtimeService {
    db: PgPool,
    channel: String,
    reconnect_delay: Duration,
    events: EventProducer,
}

impl RealtimeService {
    pub fn new(db: PgPool, config: &RealtimeConfig, events: EventProducer) -> Self {
        Self {
            db,
            channel: config.channel.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            events,
        }
    }

    /// Run the listener until the process exits
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        loop {
            match self.listen().await {
                Ok(()) => tracing::warn!(channel = %self.channel, "Notification stream ended"),
                Err(e) => tracing::error!(channel = %self.channel, "Notification listener failed: {}", e),
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn listen(&self) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.db).await?;
        listener.listen(&self.channel).await?;
        tracing::info!(channel = %self.channel, "Listening for table changes");

        loop {
            let notification = listener.recv().await?;
            let change = match decode_payload(notification.payload()) {
                Ok(change) => change,
                Err(e) => {
                    tracing::warn!("Ignoring malformed change notification: {}", e);
                    continue;
                }
            };

            match self.load_event(change).await {
                Ok(Some(event)) => {
                    let receivers = publish(&self.events, event);
                    tracing::debug!(receivers, "Change event published");
                }
                // Deleted again before we read it; its DELETE follows
                Ok(None) => tracing::debug!(table = change.table.as_str(), id = %change.id, "Changed row already gone"),
                Err(e) => tracing::warn!(table = change.table.as_str(), id = %change.id, "Could not load changed row: {}", e),
            }
        }
    }

    async fn load_event(&self, change: RowChange) -> Result<Option<ChangeEvent>, sqlx::Error> {
        if !change.needs_record() {
            return Ok(Some(change.into_event(None)));
        }
        let record = load_row(&self.db, change.table, change.id).await?;
        Ok(record.map(|row| change.into_event(Some(row))))
    }
}

/// Current row as JSON, the way clients receive it
pub async fn load_row(
    db: &PgPool,
    table: Table,
    id: uuid::Uuid,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    // Table names come from a closed enum
    let sql = format!(
        "SELECT to_jsonb(t) - 'pin_hash' FROM {} t WHERE id = $1",
        table.as_str()
    );
    sqlx::query_scalar::<_, serde_json::Value>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub fn decode_payload(payload: &str) -> Result<RowChange, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Broadcast an event; returns how many sockets will receive it
pub fn publish(events: &EventProducer, event: ChangeEvent) -> usize {
    events.send(Arc::new(event)).unwrap_or(0)
}
