use chrono::Utc;
use diesel::prelude::*;

use crate::domain::errors::DomainError;
use crate::domain::order::PaymentStatus;
use crate::domain::payment::Payment;
use crate::domain::ports::{PaymentRepository, PaymentSettlement};
use crate::schema::{cart_items, payments};

use super::models::PaymentRow;
use super::order_repo::apply_transition;
use super::DieselStore;

impl PaymentRepository for DieselStore {
    fn find_payment_by_txn(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        payments::table
            .filter(payments::provider_payment_id.eq(provider_payment_id))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Payment::try_from)
            .transpose()
    }

    fn settle_payment(&self, settlement: PaymentSettlement) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let settled = diesel::update(
                payments::table
                    .filter(payments::id.eq(settlement.payment_id))
                    .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
            )
            .set((
                payments::status.eq(settlement.outcome.as_str()),
                payments::raw_response.eq(Some(&settlement.raw_response)),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(PaymentRow::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| {
                DomainError::Conflict(format!(
                    "payment {} is already settled",
                    settlement.payment_id
                ))
            })?;

            if let Some((expected, patch)) = &settlement.order_update {
                apply_transition(conn, settled.order_id, *expected, patch)?;
            }

            if let Some(customer) = settlement.clear_cart_of {
                diesel::delete(cart_items::table.filter(cart_items::customer_id.eq(customer)))
                    .execute(conn)?;
            }

            settled.try_into()
        })
    }
}
