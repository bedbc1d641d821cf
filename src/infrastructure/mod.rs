pub mod activity_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod partner_repo;
pub mod payment_repo;

use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;

use models::NewOutboxEventRow;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Postgres-backed implementation of every repository port.
#[derive(Clone)]
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Outbox row for an order event. Debezium's EventRouter SMT derives the
/// Kafka topic from `aggregate_type`.
pub(crate) fn order_event(order_id: Uuid, event_type: &str, payload: Value) -> NewOutboxEventRow {
    NewOutboxEventRow {
        id: Uuid::new_v4(),
        aggregate_type: "Order".to_string(),
        aggregate_id: order_id.to_string(),
        event_type: event_type.to_string(),
        payload,
    }
}

/// Outbox event name for an order change, keyed on the status it lands in.
pub(crate) fn transition_event_type(patch: &crate::domain::order::OrderPatch) -> &'static str {
    use crate::domain::order::OrderStatus;

    if patch.user_confirmed_delivery == Some(Some(false)) {
        return "OrderDeliveryRejected";
    }
    match patch.status {
        Some(OrderStatus::Assigned) => "OrderAssigned",
        Some(OrderStatus::Pending) => "OrderUnassigned",
        Some(OrderStatus::OutForDelivery) => "OrderOutForDelivery",
        Some(OrderStatus::Delivered) => "OrderDelivered",
        Some(OrderStatus::Cancelled) => "OrderCancelled",
        None if patch.payment_status.is_some() => "OrderPaymentUpdated",
        None => "OrderUpdated",
    }
}
