use serde_json::Value;
use uuid::Uuid;

use super::activity::{ActivityFilter, ActivityReview, MaliciousActivity, NewActivity};
use super::checkout::Product;
use super::errors::DomainError;
use super::order::{ListResult, NewOrder, Order, OrderFilter, OrderPatch, OrderStats, OrderStatus};
use super::partner::{DeliveryPartner, PartnerStatus};
use super::payment::Payment;

pub trait OrderRepository: Send + Sync + 'static {
    /// Writes the order, its items and its payment record in one transaction.
    /// Cash-on-delivery orders also empty the customer's cart.
    fn create(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn stats(&self) -> Result<OrderStats, DomainError>;
    /// Applies `patch` only while the order is still in `expected`.
    ///
    /// Returns `Conflict` when another writer moved the order first and
    /// `NotFound` when it does not exist. `audit` is appended in the same
    /// transaction.
    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: &OrderPatch,
        audit: Option<NewActivity>,
    ) -> Result<Order, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
}

pub trait PartnerRepository: Send + Sync + 'static {
    fn create_partner(&self, user_id: Uuid) -> Result<DeliveryPartner, DomainError>;
    fn find_partner(&self, id: Uuid) -> Result<Option<DeliveryPartner>, DomainError>;
    fn find_partner_by_user(&self, user_id: Uuid) -> Result<Option<DeliveryPartner>, DomainError>;
    /// Approved and allowed partners, oldest record first.
    fn eligible_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError>;
    fn list_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError>;
    fn set_partner_status(
        &self,
        id: Uuid,
        status: PartnerStatus,
    ) -> Result<DeliveryPartner, DomainError>;
}

pub trait SettingsRepository: Send + Sync + 'static {
    fn get_setting(&self, key: &str) -> Result<Option<Value>, DomainError>;
    fn put_setting(&self, key: &str, value: Value) -> Result<(), DomainError>;
}

/// Outcome of a gateway callback, written atomically.
#[derive(Debug, Clone)]
pub struct PaymentSettlement {
    pub payment_id: Uuid,
    pub outcome: super::order::PaymentStatus,
    pub raw_response: Value,
    /// Order-side change guarded by the order's current status.
    pub order_update: Option<(OrderStatus, OrderPatch)>,
    /// Customer whose cart is emptied once the payment succeeds.
    pub clear_cart_of: Option<Uuid>,
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn find_payment_by_txn(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError>;
    /// Settles a still-pending payment. `Conflict` when it was settled already.
    fn settle_payment(&self, settlement: PaymentSettlement) -> Result<Payment, DomainError>;
}

pub trait ActivityRepository: Send + Sync + 'static {
    fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<MaliciousActivity>, DomainError>;
    fn find_activity(&self, id: Uuid) -> Result<Option<MaliciousActivity>, DomainError>;
    fn count_partner_activities(&self, partner_id: Uuid) -> Result<i64, DomainError>;
    fn review_activity(
        &self,
        id: Uuid,
        expected: super::activity::ReviewStatus,
        review: &ActivityReview,
    ) -> Result<MaliciousActivity, DomainError>;
}

/// Everything the application layer needs from persistence.
pub trait Store:
    OrderRepository
    + CatalogRepository
    + PartnerRepository
    + SettingsRepository
    + PaymentRepository
    + ActivityRepository
{
}

impl<T> Store for T where
    T: OrderRepository
        + CatalogRepository
        + PartnerRepository
        + SettingsRepository
        + PaymentRepository
        + ActivityRepository
{
}
