//! In-process change-notification relay.
//!
//! Every committed write publishes one [`ChangeEvent`] naming the table it
//! touched. Subscribers connected at publish time receive it; there is no
//! backlog for late subscribers. Durable delivery to other processes goes
//! through the outbox table instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::errors::DomainError;

const RELAY_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Orders,
    Products,
    Users,
    DeliveryPartners,
    MaliciousActivities,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Orders,
        Table::Products,
        Table::Users,
        Table::DeliveryPartners,
        Table::MaliciousActivities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Orders => "orders",
            Table::Products => "products",
            Table::Users => "users",
            Table::DeliveryPartners => "delivery_partners",
            Table::MaliciousActivities => "malicious_activities",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown table '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Option<Uuid>,
    /// Row after the change, when the publisher has it at hand.
    pub record: Option<Value>,
}

impl ChangeEvent {
    pub fn new<T: Serialize>(table: Table, kind: ChangeKind, row_id: Uuid, row: &T) -> Self {
        Self {
            table,
            kind,
            row_id: Some(row_id),
            record: serde_json::to_value(row).ok(),
        }
    }
}

#[derive(Clone)]
pub struct ChangeRelay {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeRelay {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(RELAY_CAPACITY);
        Self { tx }
    }

    /// Fans `event` out to current subscribers. Returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        log::debug!("relay: {} {:?} {:?}", event.table, event.kind, event.row_id);
        // No subscribers is not an error; nobody is looking.
        self.tx.send(event).unwrap_or(0)
    }

    /// Raw feed of every table.
    pub fn subscribe_all(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscribe(&self, table: Table) -> TableSubscription {
        TableSubscription {
            table,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Feed of a single table. Dropping it releases the subscription.
pub struct TableSubscription {
    table: Table,
    rx: broadcast::Receiver<ChangeEvent>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RecvOutcome {
    Event(ChangeEvent),
    /// The subscriber fell behind and `n` events were dropped; anything cached
    /// for the table should be treated as stale.
    Lagged(u64),
    Closed,
}

impl TableSubscription {
    pub fn table(&self) -> Table {
        self.table
    }

    pub async fn recv(&mut self) -> RecvOutcome {
        loop {
            match self.rx.recv().await {
                Ok(ev) if ev.table == self.table => return RecvOutcome::Event(ev),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => return RecvOutcome::Lagged(n),
                Err(broadcast::error::RecvError::Closed) => return RecvOutcome::Closed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(table: Table) -> ChangeEvent {
        ChangeEvent {
            table,
            kind: ChangeKind::Update,
            row_id: Some(Uuid::new_v4()),
            record: None,
        }
    }

    #[test]
    fn table_names_round_trip() {
        for t in Table::ALL {
            assert_eq!(t.as_str().parse::<Table>().unwrap(), t);
        }
        assert!("payments".parse::<Table>().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let relay = ChangeRelay::new();
        assert_eq!(relay.publish(event(Table::Orders)), 0);
    }

    #[tokio::test]
    async fn subscription_only_sees_its_table() {
        let relay = ChangeRelay::new();
        let mut orders = relay.subscribe(Table::Orders);

        relay.publish(event(Table::Products));
        let ev = event(Table::Orders);
        relay.publish(ev.clone());

        assert_eq!(orders.recv().await, RecvOutcome::Event(ev));
    }

    #[tokio::test]
    async fn late_subscribers_get_no_backlog() {
        let relay = ChangeRelay::new();
        relay.publish(event(Table::Orders));

        let mut late = relay.subscribe(Table::Orders);
        let fresh = event(Table::Orders);
        relay.publish(fresh.clone());

        assert_eq!(late.recv().await, RecvOutcome::Event(fresh));
    }

    #[tokio::test]
    async fn dropping_a_subscription_releases_it() {
        let relay = ChangeRelay::new();
        let sub = relay.subscribe(Table::Users);
        assert_eq!(relay.subscriber_count(), 1);
        drop(sub);
        assert_eq!(relay.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_is_told_it_lagged() {
        let relay = ChangeRelay::new();
        let mut sub = relay.subscribe(Table::Orders);
        for _ in 0..(RELAY_CAPACITY + 5) {
            relay.publish(event(Table::Orders));
        }
        assert!(matches!(sub.recv().await, RecvOutcome::Lagged(_)));
    }
}
