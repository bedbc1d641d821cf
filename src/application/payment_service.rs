use std::sync::Arc;

use serde_json::Value;

use crate::config::PayuSettings;
use crate::domain::errors::DomainError;
use crate::domain::lifecycle;
use crate::domain::order::{Order, PaymentMethod, PaymentStatus};
use crate::domain::payment::{verify_webhook, WebhookPayload};
use crate::domain::ports::{PaymentSettlement, Store};
use crate::relay::{ChangeKind, ChangeRelay, Table};

use super::{publish, AssignmentService};

/// What a gateway callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Settled {
        payment_status: PaymentStatus,
        order: Option<Order>,
    },
    /// The payment was settled by an earlier callback.
    AlreadySettled { payment_status: PaymentStatus },
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    relay: ChangeRelay,
    assignments: AssignmentService,
    payu: Option<PayuSettings>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        relay: ChangeRelay,
        assignments: AssignmentService,
        payu: Option<PayuSettings>,
    ) -> Self {
        Self {
            store,
            relay,
            assignments,
            payu,
        }
    }

    /// Settles the payment named by a verified gateway callback.
    ///
    /// Success marks the order paid, empties the cart of a pay-now order and
    /// hands the order to auto-assignment. Failure marks the order's payment
    /// failed. An order that is already closed only gets its payment record
    /// settled.
    pub fn handle_webhook(
        &self,
        payload: &WebhookPayload,
        raw: Value,
    ) -> Result<WebhookOutcome, DomainError> {
        let gateway = self.payu.as_ref().ok_or_else(|| {
            DomainError::Unavailable("online payments are not configured".to_string())
        })?;
        verify_webhook(&gateway.credentials, payload)?;

        let payment = self
            .store
            .find_payment_by_txn(&payload.txnid)?
            .ok_or_else(|| DomainError::NotFound("Payment".to_string()))?;
        if payment.status != PaymentStatus::Pending {
            log::info!(
                "payment {} already {}, callback acknowledged",
                payment.provider_payment_id,
                payment.status
            );
            return Ok(WebhookOutcome::AlreadySettled {
                payment_status: payment.status,
            });
        }
        if payload.amount()? != payment.amount {
            return Err(DomainError::InvalidInput(format!(
                "amount {} does not match payment {}",
                payload.amount, payment.provider_payment_id
            )));
        }

        let outcome = payload.outcome();
        let order = self
            .store
            .find_by_id(payment.order_id)?
            .ok_or_else(DomainError::order_not_found)?;
        let order_update = match lifecycle::record_payment(&order, outcome) {
            Ok(patch) => patch.map(|p| (order.status, p)),
            Err(e) => {
                log::warn!(
                    "payment {} settled without touching order {}: {}",
                    payment.provider_payment_id,
                    order.id,
                    e
                );
                None
            }
        };
        let clear_cart_of = (outcome == PaymentStatus::Paid
            && order.payment_method == PaymentMethod::Upi)
            .then_some(order.customer_id);
        let touches_order = order_update.is_some();

        let settled = self.store.settle_payment(PaymentSettlement {
            payment_id: payment.id,
            outcome,
            raw_response: raw,
            order_update,
            clear_cart_of,
        })?;
        log::info!(
            "payment {} for order {} settled as {}",
            settled.provider_payment_id,
            order.id,
            settled.status
        );

        let mut current = if touches_order {
            let updated = self
                .store
                .find_by_id(order.id)?
                .ok_or_else(DomainError::order_not_found)?;
            publish(&self.relay, Table::Orders, ChangeKind::Update, updated.id, &updated);
            Some(updated)
        } else {
            None
        };

        if outcome == PaymentStatus::Paid && touches_order {
            // The payment is committed; a failed assignment leaves the order
            // for an admin.
            match self.assignments.auto_assign(order.id) {
                Ok(Some(assigned)) => current = Some(assigned),
                Ok(None) => {}
                Err(e) => log::error!("auto-assignment of order {} failed: {}", order.id, e),
            }
        }

        Ok(WebhookOutcome::Settled {
            payment_status: settled.status,
            order: current,
        })
    }
}
