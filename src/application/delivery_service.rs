use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::activity::{classify_rejection, NewActivity};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle;
use crate::domain::order::Order;
use crate::domain::partner::DeliveryPartner;
use crate::domain::ports::Store;
use crate::relay::{ChangeEvent, ChangeKind, ChangeRelay, Table};

use super::{approved_partner, publish, Caller, Role};

#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn Store>,
    relay: ChangeRelay,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn Store>, relay: ChangeRelay) -> Self {
        Self { store, relay }
    }

    /// Registers the caller as a delivery partner awaiting approval.
    pub fn sign_up(&self, caller: &Caller) -> Result<DeliveryPartner, DomainError> {
        if caller.role != Role::DeliveryPartner {
            return Err(DomainError::Unauthorized(
                "only delivery accounts can register as partners".to_string(),
            ));
        }
        let partner = self.store.create_partner(caller.user_id)?;
        log::info!("delivery partner {} registered for user {}", partner.id, partner.user_id);
        publish(
            &self.relay,
            Table::DeliveryPartners,
            ChangeKind::Insert,
            partner.id,
            &partner,
        );
        Ok(partner)
    }

    /// The assigned partner reports the hand-over. The order moves to
    /// `out_for_delivery` and waits for the customer's confirmation.
    pub fn mark_delivered(&self, caller: &Caller, order_id: Uuid) -> Result<Order, DomainError> {
        let partner = approved_partner(self.store.as_ref(), caller)?;
        let order = self
            .store
            .find_by_id(order_id)?
            .ok_or_else(DomainError::order_not_found)?;

        let Some(patch) = lifecycle::mark_delivered(&order, partner.id, Utc::now())? else {
            return Ok(order);
        };
        let order = self.store.transition(order.id, order.status, &patch, None)?;
        log::info!(
            "order {} handed over by partner {}, confirmation requested from customer {}",
            order.id,
            partner.id,
            order.customer_id
        );
        publish(&self.relay, Table::Orders, ChangeKind::Update, order.id, &order);
        Ok(order)
    }

    /// The owning customer answers the confirmation request.
    ///
    /// A rejection sends the order back to `assigned` with the same partner
    /// and appends a malicious-activity record in the same write. Its
    /// severity grows with the partner's earlier records.
    pub fn confirm_delivery(
        &self,
        caller: &Caller,
        order_id: Uuid,
        confirmed: bool,
    ) -> Result<Order, DomainError> {
        let order = self
            .store
            .find_by_id(order_id)?
            .filter(|o| o.customer_id == caller.user_id)
            .ok_or_else(DomainError::order_not_found)?;

        let Some(patch) = lifecycle::confirm_delivery(&order, confirmed)? else {
            return Ok(order);
        };

        let audit = if confirmed {
            None
        } else {
            let prior = match order.delivery_partner_id {
                Some(partner) => self.store.count_partner_activities(partner)?,
                None => 0,
            };
            let (activity_type, severity) = classify_rejection(prior);
            Some(NewActivity {
                delivery_partner_id: order.delivery_partner_id,
                customer_id: order.customer_id,
                order_id: order.id,
                activity_type,
                severity,
                description: format!(
                    "customer rejected the delivery of order {} ({} earlier record(s) for this partner)",
                    order.id, prior
                ),
            })
        };
        let disputed = audit.is_some();

        let order = self.store.transition(order.id, order.status, &patch, audit)?;
        if disputed {
            log::warn!(
                "delivery of order {} rejected by customer {}, returned to partner {:?}",
                order.id,
                order.customer_id,
                order.delivery_partner_id
            );
            self.relay.publish(ChangeEvent {
                table: Table::MaliciousActivities,
                kind: ChangeKind::Insert,
                row_id: None,
                record: None,
            });
        } else {
            log::info!("order {} delivered and confirmed", order.id);
        }
        publish(&self.relay, Table::Orders, ChangeKind::Update, order.id, &order);
        Ok(order)
    }
}
