use chrono::Utc;
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::partner::{DeliveryPartner, PartnerStatus};
use crate::domain::ports::{PartnerRepository, SettingsRepository};
use crate::schema::{delivery_partners, settings};

use super::models::{NewPartnerRow, PartnerRow};
use super::DieselStore;

impl PartnerRepository for DieselStore {
    fn create_partner(&self, user_id: Uuid) -> Result<DeliveryPartner, DomainError> {
        let mut conn = self.pool.get()?;

        let inserted = diesel::insert_into(delivery_partners::table)
            .values(&NewPartnerRow {
                id: Uuid::new_v4(),
                user_id,
                status: PartnerStatus::Pending.as_str().to_string(),
                allowed: PartnerStatus::Pending.allowed(),
            })
            .on_conflict(delivery_partners::user_id)
            .do_nothing()
            .returning(PartnerRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        match inserted {
            Some(row) => row.try_into(),
            None => Err(DomainError::Conflict(format!(
                "user {user_id} already has a delivery partner record"
            ))),
        }
    }

    fn find_partner(&self, id: Uuid) -> Result<Option<DeliveryPartner>, DomainError> {
        let mut conn = self.pool.get()?;

        delivery_partners::table
            .filter(delivery_partners::id.eq(id))
            .select(PartnerRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(DeliveryPartner::try_from)
            .transpose()
    }

    fn find_partner_by_user(&self, user_id: Uuid) -> Result<Option<DeliveryPartner>, DomainError> {
        let mut conn = self.pool.get()?;

        delivery_partners::table
            .filter(delivery_partners::user_id.eq(user_id))
            .select(PartnerRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(DeliveryPartner::try_from)
            .transpose()
    }

    fn eligible_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError> {
        let mut conn = self.pool.get()?;

        delivery_partners::table
            .filter(delivery_partners::status.eq(PartnerStatus::Approved.as_str()))
            .filter(delivery_partners::allowed.eq(true))
            .order((delivery_partners::created_at.asc(), delivery_partners::id.asc()))
            .select(PartnerRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(DeliveryPartner::try_from)
            .collect()
    }

    fn list_partners(&self) -> Result<Vec<DeliveryPartner>, DomainError> {
        let mut conn = self.pool.get()?;

        delivery_partners::table
            .order(delivery_partners::created_at.desc())
            .select(PartnerRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(DeliveryPartner::try_from)
            .collect()
    }

    fn set_partner_status(
        &self,
        id: Uuid,
        status: PartnerStatus,
    ) -> Result<DeliveryPartner, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(delivery_partners::table.filter(delivery_partners::id.eq(id)))
            .set((
                delivery_partners::status.eq(status.as_str()),
                delivery_partners::allowed.eq(status.allowed()),
                delivery_partners::updated_at.eq(Utc::now()),
            ))
            .returning(PartnerRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| DomainError::NotFound("Delivery partner".to_string()))?
            .try_into()
    }
}

impl SettingsRepository for DieselStore {
    fn get_setting(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(settings::table
            .filter(settings::key.eq(key))
            .select(settings::value)
            .first::<Value>(&mut conn)
            .optional()?)
    }

    fn put_setting(&self, key: &str, value: Value) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();

        diesel::insert_into(settings::table)
            .values((
                settings::key.eq(key),
                settings::value.eq(&value),
                settings::updated_at.eq(now),
            ))
            .on_conflict(settings::key)
            .do_update()
            .set((settings::value.eq(&value), settings::updated_at.eq(now)))
            .execute(&mut conn)?;
        Ok(())
    }
}
