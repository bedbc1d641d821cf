use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses in which an order may reference a delivery partner.
    pub fn allows_partner(&self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned | OrderStatus::OutForDelivery | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Upi => "upi",
        }
    }

    /// Pay-now methods hand the customer to an external payment step.
    pub fn is_pay_now(&self) -> bool {
        matches!(self, PaymentMethod::Upi)
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::Cod),
            "upi" => Ok(PaymentMethod::Upi),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Delivery address copied into the order at checkout. Later profile edits
/// never reach an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub recipient_name: Option<String>,
    pub phone: String,
    pub apartment: String,
    pub block_no: String,
    pub flat_no: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Product line as it was priced at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub delivery_partner_id: Option<Uuid>,
    pub delivery_confirmation_requested_at: Option<DateTime<Utc>>,
    pub user_confirmed_delivery: Option<bool>,
    pub address: DeliveryAddress,
    pub items: Vec<OrderItem>,
    pub delivery_fee: BigDecimal,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order as it would look after `patch` is written.
    pub fn apply(&self, patch: &OrderPatch) -> Order {
        let mut next = self.clone();
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(payment_status) = patch.payment_status {
            next.payment_status = payment_status;
        }
        if let Some(partner) = patch.delivery_partner_id {
            next.delivery_partner_id = partner;
        }
        if let Some(requested_at) = patch.delivery_confirmation_requested_at {
            next.delivery_confirmation_requested_at = requested_at;
        }
        if let Some(confirmed) = patch.user_confirmed_delivery {
            next.user_confirmed_delivery = confirmed;
        }
        next
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.delivery_partner_id.is_some() && !self.status.allows_partner() {
            return Err(DomainError::Internal(format!(
                "order {} would reference a delivery partner while {}",
                self.id, self.status
            )));
        }
        if self.delivery_confirmation_requested_at.is_some()
            && self.status != OrderStatus::OutForDelivery
        {
            return Err(DomainError::Internal(format!(
                "order {} would carry a confirmation request while {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

/// Column-level change to an order. `None` leaves a column untouched; for
/// nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub delivery_partner_id: Option<Option<Uuid>>,
    pub delivery_confirmation_requested_at: Option<Option<DateTime<Utc>>>,
    pub user_confirmed_delivery: Option<Option<bool>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == OrderPatch::default()
    }
}

/// Fully validated order ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub payment_method: PaymentMethod,
    pub address: DeliveryAddress,
    pub items: Vec<OrderItem>,
    pub delivery_fee: BigDecimal,
    pub total_amount: BigDecimal,
    /// Pay-now orders carry the payment record written with them.
    pub payment: Option<super::payment::NewPayment>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub delivery_partner_id: Option<Uuid>,
    pub statuses: Vec<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.map_or(true, |c| order.customer_id == c)
            && self
                .delivery_partner_id
                .map_or(true, |p| order.delivery_partner_id == Some(p))
            && (self.statuses.is_empty() || self.statuses.contains(&order.status))
    }
}

/// Row offset of a 1-based page. Pages past the addressable range are
/// rejected rather than wrapped.
pub fn page_offset(page: i64, limit: i64) -> Result<i64, DomainError> {
    if page < 1 || limit < 1 {
        return Err(DomainError::InvalidInput(
            "page and limit must be at least 1".to_string(),
        ));
    }
    (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| DomainError::InvalidInput(format!("page {page} is out of range")))
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStats {
    pub total_orders: i64,
    pub by_status: Vec<(OrderStatus, i64)>,
    pub delivered_revenue: BigDecimal,
    pub awaiting_assignment: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Cod,
            delivery_partner_id: None,
            delivery_confirmation_requested_at: None,
            user_confirmed_delivery: None,
            address: DeliveryAddress {
                recipient_name: None,
                phone: "9876543210".to_string(),
                apartment: "Lake View".to_string(),
                block_no: "B".to_string(),
                flat_no: "402".to_string(),
                note: None,
            },
            items: vec![],
            delivery_fee: BigDecimal::from(20),
            total_amount: BigDecimal::from(20),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_parses_its_own_string_form() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("confirmed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn payment_method_parse_is_case_insensitive() {
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn apply_clears_nullable_columns_with_some_none() {
        let mut order = sample_order();
        order.status = OrderStatus::Assigned;
        order.delivery_partner_id = Some(Uuid::new_v4());

        let next = order.apply(&OrderPatch {
            status: Some(OrderStatus::Pending),
            delivery_partner_id: Some(None),
            ..Default::default()
        });

        assert_eq!(next.status, OrderStatus::Pending);
        assert!(next.delivery_partner_id.is_none());
        assert!(next.check_invariants().is_ok());
    }

    #[test]
    fn partner_on_pending_order_violates_invariant() {
        let mut order = sample_order();
        order.delivery_partner_id = Some(Uuid::new_v4());
        assert!(order.check_invariants().is_err());
    }

    #[test]
    fn confirmation_request_outside_out_for_delivery_violates_invariant() {
        let mut order = sample_order();
        order.status = OrderStatus::Delivered;
        order.delivery_partner_id = Some(Uuid::new_v4());
        order.delivery_confirmation_requested_at = Some(Utc::now());
        assert!(order.check_invariants().is_err());
    }

    #[test]
    fn page_offset_rejects_out_of_range_pages() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 20).unwrap(), 40);
        assert!(matches!(
            page_offset(i64::MAX, 100),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(page_offset(0, 20).is_err());
    }

    #[test]
    fn filter_matches_on_all_given_criteria() {
        let mut order = sample_order();
        order.status = OrderStatus::Assigned;
        let partner = Uuid::new_v4();
        order.delivery_partner_id = Some(partner);

        let filter = OrderFilter {
            delivery_partner_id: Some(partner),
            statuses: vec![OrderStatus::Assigned, OrderStatus::OutForDelivery],
            ..Default::default()
        };
        assert!(filter.matches(&order));

        let other_customer = OrderFilter {
            customer_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!other_customer.matches(&order));
    }
}
