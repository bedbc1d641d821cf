use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::domain::activity::{ActivityFilter, ActivityReview, MaliciousActivity, ReviewStatus};
use crate::domain::assignment::AUTO_ASSIGN_SETTING;
use crate::domain::errors::DomainError;
use crate::domain::partner::{DeliveryPartner, PartnerStatus};
use crate::domain::ports::Store;
use crate::relay::{ChangeKind, ChangeRelay, Table};

use super::{auto_assign_flag, publish, Caller};

/// Partner registry, settings and activity review. Every call requires an
/// admin caller.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
    relay: ChangeRelay,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, relay: ChangeRelay) -> Self {
        Self { store, relay }
    }

    pub fn list_partners(&self, caller: &Caller) -> Result<Vec<DeliveryPartner>, DomainError> {
        caller.require_admin()?;
        self.store.list_partners()
    }

    /// Approves, pauses or removes a partner. Partners never go back to
    /// `pending`.
    pub fn set_partner_status(
        &self,
        caller: &Caller,
        partner_id: Uuid,
        status: PartnerStatus,
    ) -> Result<DeliveryPartner, DomainError> {
        caller.require_admin()?;
        if status == PartnerStatus::Pending {
            return Err(DomainError::InvalidInput(
                "a partner cannot be moved back to pending".to_string(),
            ));
        }
        let partner = self.store.set_partner_status(partner_id, status)?;
        log::info!(
            "delivery partner {} set to {} by {}",
            partner.id,
            partner.status,
            caller.user_id
        );
        publish(
            &self.relay,
            Table::DeliveryPartners,
            ChangeKind::Update,
            partner.id,
            &partner,
        );
        Ok(partner)
    }

    pub fn auto_assign_enabled(&self, caller: &Caller) -> Result<bool, DomainError> {
        caller.require_admin()?;
        auto_assign_flag(self.store.as_ref())
    }

    pub fn set_auto_assign(&self, caller: &Caller, enabled: bool) -> Result<bool, DomainError> {
        caller.require_admin()?;
        self.store.put_setting(AUTO_ASSIGN_SETTING, json!(enabled))?;
        log::info!("auto-assignment {} by {}", if enabled { "enabled" } else { "disabled" }, caller.user_id);
        Ok(enabled)
    }

    pub fn list_activities(
        &self,
        caller: &Caller,
        filter: &ActivityFilter,
    ) -> Result<Vec<MaliciousActivity>, DomainError> {
        caller.require_admin()?;
        self.store.list_activities(filter)
    }

    pub fn review_activity(
        &self,
        caller: &Caller,
        activity_id: Uuid,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<MaliciousActivity, DomainError> {
        caller.require_admin()?;
        let current = self
            .store
            .find_activity(activity_id)?
            .ok_or_else(|| DomainError::NotFound("Activity".to_string()))?;
        current.status.ensure_can_move_to(status)?;

        let review = ActivityReview {
            status,
            notes: notes.filter(|n| !n.trim().is_empty()),
            reviewer: caller.user_id,
            reviewed_at: Utc::now(),
        };
        let activity = self
            .store
            .review_activity(activity_id, current.status, &review)?;
        log::info!(
            "activity {} moved {} -> {} by {}",
            activity.id,
            current.status,
            activity.status,
            caller.user_id
        );
        publish(
            &self.relay,
            Table::MaliciousActivities,
            ChangeKind::Update,
            activity.id,
            &activity,
        );
        Ok(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Role;
    use crate::domain::activity::{ActivityType, NewActivity, Severity};
    use crate::domain::order::{
        DeliveryAddress, NewOrder, OrderItem, OrderPatch, OrderStatus, PaymentMethod,
    };
    use crate::application::AssignmentService;
    use crate::domain::assignment::AssignmentPolicy;
    use crate::domain::ports::{
        ActivityRepository, OrderRepository, PartnerRepository, SettingsRepository,
    };
    use crate::infrastructure::memory::MemoryStore;
    use bigdecimal::BigDecimal;

    fn admin() -> Caller {
        Caller::new(Uuid::new_v4(), Role::Admin)
    }

    fn service(store: &MemoryStore) -> AdminService {
        AdminService::new(Arc::new(store.clone()), ChangeRelay::new())
    }

    /// Records one activity through a cancel transition.
    fn seed_activity(store: &MemoryStore) -> Uuid {
        let order = store
            .create(NewOrder {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                payment_method: PaymentMethod::Cod,
                address: DeliveryAddress {
                    recipient_name: None,
                    phone: "9876543210".to_string(),
                    apartment: "Lake View".to_string(),
                    block_no: "B".to_string(),
                    flat_no: "402".to_string(),
                    note: None,
                },
                items: vec![OrderItem {
                    product_id: Uuid::new_v4(),
                    product_name: "Milk".to_string(),
                    quantity: 1,
                    unit_price: BigDecimal::from(10),
                }],
                delivery_fee: BigDecimal::from(20),
                total_amount: BigDecimal::from(30),
                payment: None,
            })
            .unwrap();
        store
            .transition(
                order.id,
                OrderStatus::Pending,
                &OrderPatch {
                    status: Some(OrderStatus::Cancelled),
                    ..Default::default()
                },
                Some(NewActivity {
                    delivery_partner_id: None,
                    customer_id: order.customer_id,
                    order_id: order.id,
                    activity_type: ActivityType::SuspiciousBehavior,
                    severity: Severity::Low,
                    description: "test".to_string(),
                }),
            )
            .unwrap();
        store.list_activities(&ActivityFilter::default()).unwrap()[0].id
    }

    #[test]
    fn partner_lifecycle_controls_eligibility() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let partner = store.create_partner(Uuid::new_v4()).unwrap();

        let approved = svc
            .set_partner_status(&admin(), partner.id, PartnerStatus::Approved)
            .unwrap();
        assert!(approved.is_eligible());
        let paused = svc
            .set_partner_status(&admin(), partner.id, PartnerStatus::Paused)
            .unwrap();
        assert!(!paused.allowed);
        assert!(matches!(
            svc.set_partner_status(&admin(), partner.id, PartnerStatus::Pending),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(svc.list_partners(&admin()).unwrap().len(), 1);
    }

    #[test]
    fn settings_toggle_round_trips() {
        let store = MemoryStore::new();
        let svc = service(&store);
        assert!(!svc.auto_assign_enabled(&admin()).unwrap());
        svc.set_auto_assign(&admin(), true).unwrap();
        assert!(svc.auto_assign_enabled(&admin()).unwrap());

        let customer = Caller::new(Uuid::new_v4(), Role::Customer);
        assert!(matches!(
            svc.set_auto_assign(&customer, false),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn settings_view_matches_what_auto_assignment_sees() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let assignments = AssignmentService::new(
            Arc::new(store.clone()),
            ChangeRelay::new(),
            AssignmentPolicy::RoundRobin,
        );

        store.put_setting(AUTO_ASSIGN_SETTING, json!("yes")).unwrap();
        assert!(!svc.auto_assign_enabled(&admin()).unwrap());
        assert!(!assignments.auto_assign_enabled().unwrap());

        svc.set_auto_assign(&admin(), true).unwrap();
        assert!(svc.auto_assign_enabled(&admin()).unwrap());
        assert!(assignments.auto_assign_enabled().unwrap());
    }

    #[test]
    fn review_moves_forward_and_stops_at_final_states() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let id = seed_activity(&store);
        let reviewer = admin();

        let reviewed = svc
            .review_activity(&reviewer, id, ReviewStatus::Reviewed, Some("checking".to_string()))
            .unwrap();
        assert_eq!(reviewed.status, ReviewStatus::Reviewed);
        assert_eq!(reviewed.reviewed_by, Some(reviewer.user_id));

        svc.review_activity(&reviewer, id, ReviewStatus::Dismissed, None)
            .unwrap();
        assert!(matches!(
            svc.review_activity(&reviewer, id, ReviewStatus::Resolved, None),
            Err(DomainError::Conflict(_))
        ));

        let dismissed = svc
            .list_activities(
                &reviewer,
                &ActivityFilter {
                    status: Some(ReviewStatus::Dismissed),
                    severity: None,
                },
            )
            .unwrap();
        assert_eq!(dismissed.len(), 1);
    }
}
