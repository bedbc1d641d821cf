use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::activity::MaliciousActivity;
use crate::domain::checkout::Product;
use crate::domain::errors::DomainError;
use crate::domain::order::{DeliveryAddress, Order, OrderItem, OrderPatch};
use crate::domain::partner::DeliveryPartner;
use crate::domain::payment::Payment;
use crate::schema::{
    commerce_order_outbox, delivery_partners, malicious_activities, order_items, orders, payments,
    products,
};

fn decode_address(value: Value) -> Result<DeliveryAddress, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::Internal(format!("stored address is malformed: {e}")))
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub delivery_partner_id: Option<Uuid>,
    pub delivery_confirmation_requested_at: Option<DateTime<Utc>>,
    pub user_confirmed_delivery: Option<bool>,
    pub address: Value,
    pub delivery_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_domain(self, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            status: self.status.parse()?,
            payment_status: self.payment_status.parse()?,
            payment_method: self.payment_method.parse()?,
            delivery_partner_id: self.delivery_partner_id,
            delivery_confirmation_requested_at: self.delivery_confirmation_requested_at,
            user_confirmed_delivery: self.user_confirmed_delivery,
            address: decode_address(self.address)?,
            items: items.into_iter().map(OrderItemRow::into_domain).collect(),
            delivery_fee: self.delivery_fee,
            total_amount: self.total_amount,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub address: Value,
    pub delivery_fee: BigDecimal,
    pub total_amount: BigDecimal,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub delivery_partner_id: Option<Option<Uuid>>,
    pub delivery_confirmation_requested_at: Option<Option<DateTime<Utc>>>,
    pub user_confirmed_delivery: Option<Option<bool>>,
}

impl From<&OrderPatch> for OrderChangeset {
    fn from(patch: &OrderPatch) -> Self {
        Self {
            status: patch.status.map(|s| s.as_str().to_string()),
            payment_status: patch.payment_status.map(|s| s.as_str().to_string()),
            delivery_partner_id: patch.delivery_partner_id,
            delivery_confirmation_requested_at: patch.delivery_confirmation_requested_at,
            user_confirmed_delivery: patch.user_confirmed_delivery,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItemRow {
    pub fn into_domain(self) -> OrderItem {
        OrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub status: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            active: row.status == "active",
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = delivery_partners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PartnerRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PartnerRow> for DeliveryPartner {
    type Error = DomainError;

    fn try_from(row: PartnerRow) -> Result<Self, Self::Error> {
        Ok(DeliveryPartner {
            id: row.id,
            user_id: row.user_id,
            status: row.status.parse()?,
            allowed: row.allowed,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = delivery_partners)]
pub struct NewPartnerRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_payment_id: String,
    pub amount: BigDecimal,
    pub status: String,
    pub raw_response: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            provider: row.provider,
            provider_payment_id: row.provider_payment_id,
            amount: row.amount,
            status: row.status.parse()?,
            raw_response: row.raw_response,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_payment_id: String,
    pub amount: BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = malicious_activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    pub id: Uuid,
    pub delivery_partner_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub activity_type: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub resolution_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for MaliciousActivity {
    type Error = DomainError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(MaliciousActivity {
            id: row.id,
            delivery_partner_id: row.delivery_partner_id,
            customer_id: row.customer_id,
            order_id: row.order_id,
            activity_type: row.activity_type.parse()?,
            severity: row.severity.parse()?,
            description: row.description,
            status: row.status.parse()?,
            resolution_notes: row.resolution_notes,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = malicious_activities)]
pub struct NewActivityRow {
    pub id: Uuid,
    pub delivery_partner_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub activity_type: String,
    pub severity: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = commerce_order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = commerce_order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
