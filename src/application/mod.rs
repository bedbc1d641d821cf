pub mod admin_service;
pub mod assignment_service;
pub mod delivery_service;
pub mod order_service;
pub mod payment_service;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::assignment::AUTO_ASSIGN_SETTING;
use crate::domain::errors::DomainError;
use crate::domain::partner::DeliveryPartner;
use crate::domain::ports::Store;
use crate::relay::{ChangeEvent, ChangeKind, ChangeRelay, Table};

pub use admin_service::AdminService;
pub use assignment_service::AssignmentService;
pub use delivery_service::DeliveryService;
pub use order_service::OrderService;
pub use payment_service::PaymentService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    DeliveryPartner,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Customer => "customer",
            Role::DeliveryPartner => "delivery_partner",
            Role::Admin => "admin",
        })
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "delivery_partner" | "delivery" => Ok(Role::DeliveryPartner),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Unauthorized(format!("unknown role '{other}'"))),
        }
    }
}

/// Identity of whoever is calling, as resolved by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Unauthorized("admin access required".to_string()))
        }
    }
}

/// Resolves the caller to an approved, allowed delivery partner.
pub(crate) fn approved_partner(
    store: &dyn Store,
    caller: &Caller,
) -> Result<DeliveryPartner, DomainError> {
    let unauthorized =
        || DomainError::Unauthorized("caller is not an approved delivery partner".to_string());
    if caller.role != Role::DeliveryPartner {
        return Err(unauthorized());
    }
    match store.find_partner_by_user(caller.user_id)? {
        Some(partner) if partner.is_eligible() => Ok(partner),
        _ => Err(unauthorized()),
    }
}

/// The auto-assignment switch. Missing or non-boolean values read as off.
pub(crate) fn auto_assign_flag(store: &dyn Store) -> Result<bool, DomainError> {
    Ok(store
        .get_setting(AUTO_ASSIGN_SETTING)?
        .as_ref()
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false))
}

pub(crate) fn publish<T: Serialize>(
    relay: &ChangeRelay,
    table: Table,
    kind: ChangeKind,
    id: Uuid,
    row: &T,
) {
    relay.publish(ChangeEvent::new(table, kind, id, row));
}
