use async_trait::async_trait;
use kanau::processor::Processor;
use time::OffsetDateTime;

use super::{ClaimOutcome, ReservationFilter, ReservationStore, StoreError};
use crate::entities::founder::set_founder_user_type;
use crate::entities::payment_reservation::{
    ApplyReservationTransition, ExpireAbandonedReservations, GetReservationByOrderReference,
    GetReservationByToken, InsertPaymentReservation, ListPaymentReservations,
    NewPaymentReservation, PaymentReservation, RESERVATION_TOKEN_CONSTRAINT,
    ReservationTransition, TokenRejection,
};
use crate::entities::payment_transaction::PaymentTransaction;
use crate::framework::DatabaseProcessor;

fn is_token_collision(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(RESERVATION_TOKEN_CONSTRAINT),
        _ => false,
    }
}

#[async_trait]
impl ReservationStore for DatabaseProcessor {
    async fn insert(&self, new: NewPaymentReservation) -> Result<PaymentReservation, StoreError> {
        self.process(InsertPaymentReservation(new))
            .await
            .map_err(|e| {
                if is_token_collision(&e) {
                    StoreError::DuplicateToken
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn find_by_order_reference(
        &self,
        order_reference: &str,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        Ok(self
            .process(GetReservationByOrderReference {
                order_reference: order_reference.to_string(),
            })
            .await?)
    }

    async fn find_by_token(
        &self,
        reservation_token: &str,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        Ok(self
            .process(GetReservationByToken {
                reservation_token: reservation_token.to_string(),
            })
            .await?)
    }

    async fn apply_transition(
        &self,
        transition: ReservationTransition,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        Ok(self.process(ApplyReservationTransition(transition)).await?)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ClaimReservation")]
    async fn claim(
        &self,
        reservation_token: &str,
        founder_id: &str,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(reservation) =
            PaymentReservation::claim_completed(&mut *tx, reservation_token, founder_id, now).await?
        else {
            tx.rollback().await?;
            let rejection = match self.find_by_token(reservation_token).await? {
                None => TokenRejection::NotFound,
                // Claimable on re-read: completion landed after our guarded update.
                Some(row) => row
                    .claim_rejection(now)
                    .unwrap_or(TokenRejection::NotCompleted),
            };
            return Ok(ClaimOutcome::Rejected(rejection));
        };

        if !set_founder_user_type(&mut *tx, founder_id, &reservation.user_type).await? {
            tx.rollback().await?;
            return Ok(ClaimOutcome::FounderNotFound);
        }

        let transaction = PaymentTransaction::for_claim(&reservation, founder_id, now);
        PaymentTransaction::insert(&mut *tx, &transaction).await?;

        tx.commit().await?;
        Ok(ClaimOutcome::Claimed {
            reservation,
            transaction,
        })
    }

    async fn list(&self, filter: ReservationFilter) -> Result<Vec<PaymentReservation>, StoreError> {
        Ok(self
            .process(ListPaymentReservations {
                limit: filter.limit,
                offset: filter.offset,
                status: filter.status,
                email: filter.email,
            })
            .await?)
    }

    async fn expire_abandoned(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        Ok(self.process(ExpireAbandonedReservations { now }).await?)
    }
}
