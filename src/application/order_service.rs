use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::PayuSettings;
use crate::domain::checkout::{self, CartLine, CheckoutInput, CheckoutPolicy};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle;
use crate::domain::order::{
    DeliveryAddress, ListResult, Order, OrderFilter, OrderStats, OrderStatus, PaymentMethod,
};
use crate::domain::payment::{new_transaction_id, request_hash, NewPayment, PayuRequest, PROVIDER_PAYU};
use crate::domain::ports::Store;
use crate::relay::{ChangeKind, ChangeRelay, Table};

use super::{approved_partner, publish, Caller, Role};

/// Contact details the gateway needs on its payment form.
#[derive(Debug, Clone, Default)]
pub struct Payer {
    pub first_name: Option<String>,
    pub email: Option<String>,
}

/// Form the client posts to the payment gateway to finish a pay-now order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRedirect {
    pub action: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub redirect: Option<PaymentRedirect>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    relay: ChangeRelay,
    policy: CheckoutPolicy,
    payu: Option<PayuSettings>,
    app_url: String,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        relay: ChangeRelay,
        policy: CheckoutPolicy,
        payu: Option<PayuSettings>,
        app_url: String,
    ) -> Self {
        Self {
            store,
            relay,
            policy,
            payu,
            app_url,
        }
    }

    /// Creates a `pending` order from the caller's cart lines.
    ///
    /// Cash-on-delivery orders are final once written. Pay-now orders also get
    /// a payment record and come back with the gateway form to continue.
    pub fn checkout(
        &self,
        caller: &Caller,
        lines: Vec<CartLine>,
        address: DeliveryAddress,
        payment_method: PaymentMethod,
        payer: Payer,
    ) -> Result<CheckoutOutcome, DomainError> {
        if caller.role != Role::Customer {
            return Err(DomainError::Unauthorized(
                "only customers can place orders".to_string(),
            ));
        }
        let input = CheckoutInput {
            customer_id: caller.user_id,
            lines,
            address,
            payment_method,
        };
        checkout::validate(&input, &self.policy)?;

        let gateway = if payment_method.is_pay_now() {
            Some(self.payu.as_ref().ok_or_else(|| {
                DomainError::Unavailable("online payments are not configured".to_string())
            })?)
        } else {
            None
        };

        let ids: Vec<Uuid> = checkout::merge_lines(&input.lines)?
            .iter()
            .map(|l| l.product_id)
            .collect();
        let products = self.store.find_products(&ids)?;
        let items = checkout::snapshot_items(&input.lines, &products)?;

        let mut new_order = checkout::build_order(Uuid::new_v4(), &input, items, &self.policy, None);
        let txnid = gateway.map(|_| new_transaction_id(Utc::now()));
        if let Some(txnid) = &txnid {
            new_order.payment = Some(NewPayment {
                id: Uuid::new_v4(),
                provider: PROVIDER_PAYU.to_string(),
                provider_payment_id: txnid.clone(),
                amount: new_order.total_amount.clone(),
            });
        }

        let order = self.store.create(new_order)?;
        log::info!(
            "order {} created for customer {} ({}, total {})",
            order.id,
            order.customer_id,
            order.payment_method.as_str(),
            order.total_amount
        );
        publish(&self.relay, Table::Orders, ChangeKind::Insert, order.id, &order);

        let redirect = match (gateway, txnid) {
            (Some(gateway), Some(txnid)) => Some(self.payment_redirect(gateway, &order, txnid, payer)),
            _ => None,
        };
        Ok(CheckoutOutcome { order, redirect })
    }

    fn payment_redirect(
        &self,
        gateway: &PayuSettings,
        order: &Order,
        txnid: String,
        payer: Payer,
    ) -> PaymentRedirect {
        let request = PayuRequest {
            txnid,
            amount: order.total_amount.with_scale(2).to_string(),
            productinfo: format!("Order {}", order.id),
            firstname: payer
                .first_name
                .or_else(|| order.address.recipient_name.clone())
                .unwrap_or_else(|| "Customer".to_string()),
            email: payer.email.unwrap_or_default(),
        };
        let hash = request_hash(&gateway.credentials, &request);

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), gateway.credentials.merchant_key.clone());
        fields.insert("txnid".to_string(), request.txnid);
        fields.insert("amount".to_string(), request.amount);
        fields.insert("productinfo".to_string(), request.productinfo);
        fields.insert("firstname".to_string(), request.firstname);
        fields.insert("email".to_string(), request.email);
        fields.insert("phone".to_string(), order.address.phone.clone());
        fields.insert("surl".to_string(), format!("{}/payment/success", self.app_url));
        fields.insert("furl".to_string(), format!("{}/payment/failure", self.app_url));
        fields.insert("service_provider".to_string(), "payu_paisa".to_string());
        fields.insert("hash".to_string(), hash);

        PaymentRedirect {
            action: gateway.base_url.clone(),
            fields,
        }
    }

    /// Order detail for its owner, its assigned partner or an admin. Anyone
    /// else gets `NotFound` so existence is not revealed.
    pub fn get(&self, caller: &Caller, id: Uuid) -> Result<Order, DomainError> {
        let order = self
            .store
            .find_by_id(id)?
            .ok_or_else(DomainError::order_not_found)?;

        let visible = match caller.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == caller.user_id,
            Role::DeliveryPartner => match order.delivery_partner_id {
                Some(partner_id) => self
                    .store
                    .find_partner_by_user(caller.user_id)?
                    .is_some_and(|p| p.id == partner_id),
                None => false,
            },
        };
        if visible {
            Ok(order)
        } else {
            Err(DomainError::order_not_found())
        }
    }

    /// The caller's own order history, newest first.
    pub fn list_mine(&self, caller: &Caller, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let filter = OrderFilter {
            customer_id: Some(caller.user_id),
            ..Default::default()
        };
        self.store.list(&filter, page, limit)
    }

    /// Open assignments of the calling delivery partner.
    pub fn list_assigned(&self, caller: &Caller, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let partner = approved_partner(self.store.as_ref(), caller)?;
        let filter = OrderFilter {
            delivery_partner_id: Some(partner.id),
            statuses: vec![OrderStatus::Assigned, OrderStatus::OutForDelivery],
            ..Default::default()
        };
        self.store.list(&filter, page, limit)
    }

    pub fn list_all(
        &self,
        caller: &Caller,
        statuses: Vec<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        caller.require_admin()?;
        let filter = OrderFilter {
            statuses,
            ..Default::default()
        };
        self.store.list(&filter, page, limit)
    }

    pub fn stats(&self, caller: &Caller) -> Result<OrderStats, DomainError> {
        caller.require_admin()?;
        self.store.stats()
    }

    /// Cancels a still-pending order. Owners and admins only.
    pub fn cancel(&self, caller: &Caller, id: Uuid) -> Result<Order, DomainError> {
        let order = self.get(caller, id)?;
        if !caller.is_admin() && order.customer_id != caller.user_id {
            return Err(DomainError::order_not_found());
        }
        let Some(patch) = lifecycle::cancel(&order)? else {
            return Ok(order);
        };

        let order = self.store.transition(order.id, order.status, &patch, None)?;
        log::info!("order {} cancelled by {}", order.id, caller.user_id);
        publish(&self.relay, Table::Orders, ChangeKind::Update, order.id, &order);
        Ok(order)
    }
}
