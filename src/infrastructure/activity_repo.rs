use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::activity::{ActivityFilter, ActivityReview, MaliciousActivity, ReviewStatus};
use crate::domain::errors::DomainError;
use crate::domain::ports::ActivityRepository;
use crate::schema::malicious_activities;

use super::models::ActivityRow;
use super::DieselStore;

fn not_found() -> DomainError {
    DomainError::NotFound("Activity".to_string())
}

impl ActivityRepository for DieselStore {
    fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<MaliciousActivity>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = malicious_activities::table.into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(malicious_activities::status.eq(status.as_str()));
        }
        if let Some(severity) = filter.severity {
            query = query.filter(malicious_activities::severity.eq(severity.as_str()));
        }

        query
            .order(malicious_activities::created_at.desc())
            .select(ActivityRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(MaliciousActivity::try_from)
            .collect()
    }

    fn find_activity(&self, id: Uuid) -> Result<Option<MaliciousActivity>, DomainError> {
        let mut conn = self.pool.get()?;

        malicious_activities::table
            .filter(malicious_activities::id.eq(id))
            .select(ActivityRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(MaliciousActivity::try_from)
            .transpose()
    }

    fn count_partner_activities(&self, partner_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(malicious_activities::table
            .filter(malicious_activities::delivery_partner_id.eq(partner_id))
            .count()
            .get_result(&mut conn)?)
    }

    fn review_activity(
        &self,
        id: Uuid,
        expected: ReviewStatus,
        review: &ActivityReview,
    ) -> Result<MaliciousActivity, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                malicious_activities::table
                    .filter(malicious_activities::id.eq(id))
                    .filter(malicious_activities::status.eq(expected.as_str())),
            )
            .set((
                malicious_activities::status.eq(review.status.as_str()),
                malicious_activities::resolution_notes.eq(review.notes.as_deref()),
                malicious_activities::reviewed_by.eq(Some(review.reviewer)),
                malicious_activities::reviewed_at.eq(Some(review.reviewed_at)),
            ))
            .returning(ActivityRow::as_returning())
            .get_result(conn)
            .optional()?;

            match updated {
                Some(row) => row.try_into(),
                None => {
                    let exists: bool = diesel::select(diesel::dsl::exists(
                        malicious_activities::table.filter(malicious_activities::id.eq(id)),
                    ))
                    .get_result(conn)?;
                    Err(if exists {
                        DomainError::Conflict(format!("activity {id} is no longer {expected}"))
                    } else {
                        not_found()
                    })
                }
            }
        })
    }
}
