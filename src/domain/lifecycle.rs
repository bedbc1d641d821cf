//! Order status transitions.
//!
//! Every function looks at the current order and returns the patch that moves
//! it forward, `Ok(None)` when the requested state is already in place, or an
//! error when the move is not allowed from the current status. Callers write
//! the patch conditionally on the status they read.
//!
//! ```text
//! pending --assign--> assigned --mark_delivered--> out_for_delivery --confirm(true)--> delivered
//! pending --cancel--> cancelled
//! out_for_delivery --confirm(false)--> assigned (re-delivery, dispute recorded)
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{Order, OrderPatch, OrderStatus, PaymentStatus};

fn ensure_open(order: &Order) -> Result<(), DomainError> {
    if order.status.is_terminal() {
        return Err(DomainError::Conflict(format!(
            "order {} is {} and can no longer change",
            order.id, order.status
        )));
    }
    Ok(())
}

/// Assign `partner`, or clear the assignment when `partner` is `None`.
pub fn assign(order: &Order, partner: Option<Uuid>) -> Result<Option<OrderPatch>, DomainError> {
    ensure_open(order)?;
    if order.status == OrderStatus::OutForDelivery {
        return Err(DomainError::Conflict(format!(
            "order {} is already out for delivery",
            order.id
        )));
    }

    match partner {
        Some(p) if order.status == OrderStatus::Assigned && order.delivery_partner_id == Some(p) => {
            Ok(None)
        }
        Some(p) => Ok(Some(OrderPatch {
            status: Some(OrderStatus::Assigned),
            delivery_partner_id: Some(Some(p)),
            ..Default::default()
        })),
        None if order.status == OrderStatus::Pending => Ok(None),
        None => Ok(Some(OrderPatch {
            status: Some(OrderStatus::Pending),
            delivery_partner_id: Some(None),
            ..Default::default()
        })),
    }
}

/// Delivery partner reports the hand-over. Delivery stays provisional until
/// the customer answers.
pub fn mark_delivered(
    order: &Order,
    partner: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<OrderPatch>, DomainError> {
    if order.delivery_partner_id != Some(partner) {
        return Err(DomainError::order_not_found());
    }
    match order.status {
        OrderStatus::OutForDelivery => Ok(None),
        OrderStatus::Assigned => Ok(Some(OrderPatch {
            status: Some(OrderStatus::OutForDelivery),
            delivery_confirmation_requested_at: Some(Some(now)),
            user_confirmed_delivery: Some(None),
            ..Default::default()
        })),
        other => Err(DomainError::Conflict(format!(
            "order {} cannot be marked delivered while {}",
            order.id, other
        ))),
    }
}

/// Customer answers the confirmation request. A rejection sends the order
/// back to its partner for re-delivery.
pub fn confirm_delivery(order: &Order, confirmed: bool) -> Result<Option<OrderPatch>, DomainError> {
    if confirmed
        && order.status == OrderStatus::Delivered
        && order.user_confirmed_delivery == Some(true)
    {
        return Ok(None);
    }
    if order.status != OrderStatus::OutForDelivery {
        return Err(DomainError::Conflict(format!(
            "order {} has no pending delivery confirmation",
            order.id
        )));
    }

    let status = if confirmed {
        OrderStatus::Delivered
    } else {
        OrderStatus::Assigned
    };
    Ok(Some(OrderPatch {
        status: Some(status),
        delivery_confirmation_requested_at: Some(None),
        user_confirmed_delivery: Some(Some(confirmed)),
        ..Default::default()
    }))
}

pub fn cancel(order: &Order) -> Result<Option<OrderPatch>, DomainError> {
    match order.status {
        OrderStatus::Cancelled => Ok(None),
        OrderStatus::Pending => Ok(Some(OrderPatch {
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        })),
        other => Err(DomainError::Conflict(format!(
            "order {} cannot be cancelled while {}",
            order.id, other
        ))),
    }
}

/// Payment outcome reported by the gateway. Only the payment axis moves.
pub fn record_payment(
    order: &Order,
    outcome: PaymentStatus,
) -> Result<Option<OrderPatch>, DomainError> {
    ensure_open(order)?;
    if order.payment_status == outcome {
        return Ok(None);
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(DomainError::Conflict(format!(
            "order {} is already paid",
            order.id
        )));
    }
    Ok(Some(OrderPatch {
        payment_status: Some(outcome),
        ..Default::default()
    }))
}
