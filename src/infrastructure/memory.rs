//! In-memory implementation of every repository port.
//!
//! Used by the HTTP tests and for local runs without Postgres. It follows the
//! Postgres store's semantics: conditional transitions, one lock per write so
//! every write is atomic, and the same row constraints.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::activity::{
    ActivityFilter, ActivityReview, MaliciousActivity, NewActivity, ReviewStatus,
};
use crate::domain::assignment::AUTO_ASSIGN_SETTING;
use crate::domain::checkout::{CartLine, Product};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, ListResult, NewOrder, Order, OrderFilter, OrderPatch, OrderStats, OrderStatus,
    PaymentStatus,
};
use crate::domain::partner::{DeliveryPartner, PartnerStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::{
    ActivityRepository, CatalogRepository, OrderRepository, PartnerRepository,
    PaymentRepository, PaymentSettlement, SettingsRepository,
};

use super::transition_event_type;

#[derive(Debug, Clone)]
struct CartItem {
    customer_id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    products: Vec<Product>,
    cart: Vec<CartItem>,
    partners: Vec<DeliveryPartner>,
    settings: HashMap<String, Value>,
    payments: Vec<Payment>,
    activities: Vec<MaliciousActivity>,
    /// `(aggregate id, event type)` in write order.
    outbox: Vec<(Uuid, String)>,
}

impl State {
    fn order_mut(&mut self, id: Uuid) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == id)
    }

    /// Validates and computes an order transition without writing it.
    fn stage_transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: &OrderPatch,
    ) -> Result<Order, DomainError> {
        let current = self
            .orders
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(DomainError::order_not_found)?;
        if current.status != expected {
            return Err(DomainError::Conflict(format!(
                "order {id} is no longer {expected}"
            )));
        }
        let next = current.apply(patch);
        next.check_invariants()?;
        Ok(next)
    }

    fn commit_order(&mut self, next: Order, patch: &OrderPatch) {
        let id = next.id;
        if let Some(slot) = self.order_mut(id) {
            *slot = next;
        }
        self.outbox.push((id, transition_event_type(patch).to_string()));
    }
}

/// Process-local store. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut state = State::default();
        state
            .settings
            .insert(AUTO_ASSIGN_SETTING.to_string(), json!(false));
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn put_product(&self, name: &str, price: BigDecimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().products.push(Product {
            id,
            name: name.to_string(),
            price,
            stock,
            active: true,
        });
        id
    }

    pub fn set_product_price(&self, id: Uuid, price: BigDecimal) {
        if let Some(product) = self.state.lock().products.iter_mut().find(|p| p.id == id) {
            product.price = price;
        }
    }

    pub fn set_product_active(&self, id: Uuid, active: bool) {
        if let Some(product) = self.state.lock().products.iter_mut().find(|p| p.id == id) {
            product.active = active;
        }
    }

    pub fn put_cart_item(&self, customer_id: Uuid, product_id: Uuid, quantity: i32) {
        self.state.lock().cart.push(CartItem {
            customer_id,
            product_id,
            quantity,
        });
    }

    pub fn cart_quantity(&self, customer_id: Uuid) -> i32 {
        self.state
            .lock()
            .cart
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .map(|c| c.quantity)
            .sum()
    }

    /// The customer's cart as checkout lines.
    pub fn cart_lines(&self, customer_id: Uuid) -> Vec<CartLine> {
        self.state
            .lock()
            .cart
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .map(|c| CartLine {
                product_id: c.product_id,
                quantity: c.quantity,
            })
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    pub fn outbox_events(&self, order_id: Uuid) -> Vec<String> {
        self.state
            .lock()
            .outbox
            .iter()
            .filter(|(id, _)| *id == order_id)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl OrderRepository for MemoryStore {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        if order.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "an order needs at least one item".to_string(),
            ));
        }
        let mut state = self.state.lock();
        if state.orders.iter().any(|o| o.id == order.id) {
            return Err(DomainError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        let now = Utc::now();
        let created = Order {
            id: order.id,
            customer_id: order.customer_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            delivery_partner_id: None,
            delivery_confirmation_requested_at: None,
            user_confirmed_delivery: None,
            address: order.address,
            items: order.items,
            delivery_fee: order.delivery_fee,
            total_amount: order.total_amount,
            created_at: now,
        };

        match order.payment {
            Some(payment) => {
                if state
                    .payments
                    .iter()
                    .any(|p| p.provider_payment_id == payment.provider_payment_id)
                {
                    return Err(DomainError::Conflict(format!(
                        "transaction {} already exists",
                        payment.provider_payment_id
                    )));
                }
                state.payments.push(Payment {
                    id: payment.id,
                    order_id: created.id,
                    provider: payment.provider,
                    provider_payment_id: payment.provider_payment_id,
                    amount: payment.amount,
                    status: PaymentStatus::Pending,
                    raw_response: None,
                    created_at: now,
                });
            }
            None => state.cart.retain(|c| c.customer_id != created.customer_id),
        }

        state.outbox.push((created.id, "OrderCreated".to_string()));
        state.orders.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let offset = usize::try_from(page_offset(page, limit)?)
            .map_err(|_| DomainError::InvalidInput(format!("page {page} is out of range")))?;
        let state = self.state.lock();
        let matching: Vec<&Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .collect();
        Ok(ListResult {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect(),
        })
    }

    fn stats(&self) -> Result<OrderStats, DomainError> {
        let state = self.state.lock();
        let by_status: Vec<(OrderStatus, i64)> = OrderStatus::ALL
            .iter()
            .map(|s| {
                (
                    *s,
                    state.orders.iter().filter(|o| o.status == *s).count() as i64,
                )
            })
            .filter(|(_, n)| *n > 0)
            .collect();
        let delivered_revenue = state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .fold(BigDecimal::from(0), |acc, o| acc + &o.total_amount);
        let awaiting_assignment = state
            .orders
            .iter()
            .filter(|o| {
                o.status == OrderStatus::Pending
                    && (o.payment_status == PaymentStatus::Paid || !o.payment_method.is_pay_now())
            })
            .count() as i64;

        Ok(OrderStats {
            total_orders: state.orders.len() as i64,
            by_status,
            delivered_revenue,
            awaiting_assignment,
        })
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: &OrderPatch,
        audit: Option<NewActivity>,
    ) -> Result<Order, DomainError> {
        if patch.is_empty() {
            return self.find_by_id(id)?.ok_or_else(DomainError::order_not_found);
        }
        let mut state = self.state.lock();
        let next = state.stage_transition(id, expected, patch)?;
        state.commit_order(next.clone(), patch);

        if let Some(activity) = audit {
            state.activities.push(MaliciousActivity {
                id: Uuid::new_v4(),
                delivery_partner_id: activity.delivery_partner_id,
                customer_id: activity.customer_id,
                order_id: activity.order_id,
                activity_type: activity.activity_type,
                severity: activity.severity,
                description: activity.description,
                status: ReviewStatus::Pending,
                resolution_notes: None,
                reviewed_by: None,
                reviewed_at: None,
                created_at: Utc::now(),
            });
        }
        Ok(next)
    }
}

impl CatalogRepository for MemoryStore {
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .state
            .lock()
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

impl PartnerRepository for MemoryStore {
    fn create_partner(&self, user_id: Uuid) -> Result<DeliveryPartner, DomainError> {
        let mut state = self.state.lock();
        if state.partners.iter().any(|p| p.user_id == user_id) {
            return Err(DomainError::Conflict(format!(
                "user {user_id} already has a delivery partner record"
            )));
        }
        let partner = DeliveryPartner {
            id: Uuid::new_v4(),
            user_id,
            status: PartnerStatus::Pending,
            allowed: PartnerStatus::Pending.allowed(),
            created_at: Utc::now(),
        };
        state.partners.push(partner.clone());
        Ok(partner)
    }

    fn find_partner(&self, id: Uuid) -> Result<Option<DeliveryPartner>, DomainError> {
        Ok(self.state.lock().partners.iter().find(|p| p.id == id).cloned())
    }

    fn find_partner_by_user(&self, user_id: Uuid) -> Result<Option<DeliveryPartner>, DomainError> {
        Ok(self
            .state
            .lock()
            .partners
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    fn eligible_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError> {
        let mut eligible: Vec<DeliveryPartner> = self
            .state
            .lock()
            .partners
            .iter()
            .filter(|p| p.is_eligible())
            .cloned()
            .collect();
        eligible.sort_by_key(|p| p.created_at);
        Ok(eligible)
    }

    fn list_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError> {
        Ok(self.state.lock().partners.iter().rev().cloned().collect())
    }

    fn set_partner_status(
        &self,
        id: Uuid,
        status: PartnerStatus,
    ) -> Result<DeliveryPartner, DomainError> {
        let mut state = self.state.lock();
        let partner = state
            .partners
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::NotFound("Delivery partner".to_string()))?;
        partner.status = status;
        partner.allowed = status.allowed();
        Ok(partner.clone())
    }
}

impl SettingsRepository for MemoryStore {
    fn get_setting(&self, key: &str) -> Result<Option<Value>, DomainError> {
        Ok(self.state.lock().settings.get(key).cloned())
    }

    fn put_setting(&self, key: &str, value: Value) -> Result<(), DomainError> {
        self.state.lock().settings.insert(key.to_string(), value);
        Ok(())
    }
}

impl PaymentRepository for MemoryStore {
    fn find_payment_by_txn(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .state
            .lock()
            .payments
            .iter()
            .find(|p| p.provider_payment_id == provider_payment_id)
            .cloned())
    }

    fn settle_payment(&self, settlement: PaymentSettlement) -> Result<Payment, DomainError> {
        let mut state = self.state.lock();
        let index = state
            .payments
            .iter()
            .position(|p| p.id == settlement.payment_id)
            .ok_or_else(|| DomainError::NotFound("Payment".to_string()))?;
        if state.payments[index].status != PaymentStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "payment {} is already settled",
                settlement.payment_id
            )));
        }

        // Stage the order change first so a failure leaves nothing written.
        let order_id = state.payments[index].order_id;
        let staged = match &settlement.order_update {
            Some((expected, patch)) => {
                Some((state.stage_transition(order_id, *expected, patch)?, patch))
            }
            None => None,
        };

        let payment = &mut state.payments[index];
        payment.status = settlement.outcome;
        payment.raw_response = Some(settlement.raw_response.clone());
        let settled = payment.clone();

        if let Some((next, patch)) = staged {
            state.commit_order(next, patch);
        }
        if let Some(customer) = settlement.clear_cart_of {
            state.cart.retain(|c| c.customer_id != customer);
        }
        Ok(settled)
    }
}

impl ActivityRepository for MemoryStore {
    fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<MaliciousActivity>, DomainError> {
        Ok(self
            .state
            .lock()
            .activities
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    fn find_activity(&self, id: Uuid) -> Result<Option<MaliciousActivity>, DomainError> {
        Ok(self
            .state
            .lock()
            .activities
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    fn count_partner_activities(&self, partner_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .state
            .lock()
            .activities
            .iter()
            .filter(|a| a.delivery_partner_id == Some(partner_id))
            .count() as i64)
    }

    fn review_activity(
        &self,
        id: Uuid,
        expected: ReviewStatus,
        review: &ActivityReview,
    ) -> Result<MaliciousActivity, DomainError> {
        let mut state = self.state.lock();
        let activity = state
            .activities
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DomainError::NotFound("Activity".to_string()))?;
        if activity.status != expected {
            return Err(DomainError::Conflict(format!(
                "activity {id} is no longer {expected}"
            )));
        }
        activity.status = review.status;
        activity.resolution_notes = review.notes.clone();
        activity.reviewed_by = Some(review.reviewer);
        activity.reviewed_at = Some(review.reviewed_at);
        Ok(activity.clone())
    }
}
