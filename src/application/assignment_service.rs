use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::assignment::{select_partner, AssignmentPolicy, CURSOR_SETTING};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle;
use crate::domain::order::{Order, OrderStatus, PaymentStatus};
use crate::domain::ports::Store;
use crate::relay::{ChangeKind, ChangeRelay, Table};

use super::{auto_assign_flag, publish, Caller};

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn Store>,
    relay: ChangeRelay,
    policy: AssignmentPolicy,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn Store>, relay: ChangeRelay, policy: AssignmentPolicy) -> Self {
        Self {
            store,
            relay,
            policy,
        }
    }

    /// Admin assignment. `None` unassigns and puts the order back to
    /// `pending`. Repeating the current assignment changes nothing.
    pub fn assign(
        &self,
        caller: &Caller,
        order_id: Uuid,
        partner_id: Option<Uuid>,
    ) -> Result<Order, DomainError> {
        caller.require_admin()?;
        let order = self
            .store
            .find_by_id(order_id)?
            .ok_or_else(DomainError::order_not_found)?;

        if let Some(partner_id) = partner_id {
            let partner = self
                .store
                .find_partner(partner_id)?
                .ok_or_else(|| DomainError::NotFound("Delivery partner".to_string()))?;
            if !partner.is_eligible() {
                return Err(DomainError::InvalidInput(format!(
                    "delivery partner {} is {} and cannot take orders",
                    partner.id, partner.status
                )));
            }
        }

        let Some(patch) = lifecycle::assign(&order, partner_id)? else {
            return Ok(order);
        };
        let order = self.store.transition(order.id, order.status, &patch, None)?;
        match order.delivery_partner_id {
            Some(p) => log::info!("order {} assigned to partner {} by {}", order.id, p, caller.user_id),
            None => log::info!("order {} unassigned by {}", order.id, caller.user_id),
        }
        publish(&self.relay, Table::Orders, ChangeKind::Update, order.id, &order);
        Ok(order)
    }

    pub fn auto_assign_enabled(&self) -> Result<bool, DomainError> {
        auto_assign_flag(self.store.as_ref())
    }

    fn cursor(&self) -> Result<Option<Uuid>, DomainError> {
        Ok(self
            .store
            .get_setting(CURSOR_SETTING)?
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()))
    }

    /// Runs after a successful payment. Returns the assigned order, or `None`
    /// when the order is left for manual assignment.
    pub fn auto_assign(&self, order_id: Uuid) -> Result<Option<Order>, DomainError> {
        if !self.auto_assign_enabled()? {
            log::debug!("auto-assignment disabled, order {} left pending", order_id);
            return Ok(None);
        }
        let order = self
            .store
            .find_by_id(order_id)?
            .ok_or_else(DomainError::order_not_found)?;
        if order.status != OrderStatus::Pending || order.payment_status != PaymentStatus::Paid {
            log::debug!(
                "order {} is {} / {}, not eligible for auto-assignment",
                order.id,
                order.status,
                order.payment_status
            );
            return Ok(None);
        }

        let eligible = self.store.eligible_partners()?;
        let Some(partner) = select_partner(self.policy, &eligible, self.cursor()?) else {
            log::info!(
                "no eligible delivery partner, order {} left for manual assignment",
                order.id
            );
            return Ok(None);
        };

        let Some(patch) = lifecycle::assign(&order, Some(partner.id))? else {
            return Ok(Some(order));
        };
        let order = match self
            .store
            .transition(order.id, OrderStatus::Pending, &patch, None)
        {
            Ok(order) => order,
            Err(DomainError::Conflict(reason)) => {
                log::warn!("auto-assignment of order {} skipped: {}", order_id, reason);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if self.policy == AssignmentPolicy::RoundRobin {
            self.store
                .put_setting(CURSOR_SETTING, json!(partner.id.to_string()))?;
        }
        log::info!("order {} auto-assigned to partner {}", order.id, partner.id);
        publish(&self.relay, Table::Orders, ChangeKind::Update, order.id, &order);
        Ok(Some(order))
    }
}
