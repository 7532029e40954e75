use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{ClaimOutcome, ReservationFilter, ReservationStore, StoreError};
use crate::entities::PaymentStatus;
use crate::entities::payment_reservation::{
    NewPaymentReservation, PaymentReservation, ReservationTransition, TokenRejection,
};
use crate::entities::payment_transaction::PaymentTransaction;

/// Volatile [`ReservationStore`] holding everything behind one mutex.
///
/// Each operation runs under the lock, which gives it the same atomicity the
/// conditional SQL statements give the Postgres store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    reservations: Vec<PaymentReservation>,
    /// founder id → user type
    founders: HashMap<String, String>,
    transactions: Vec<PaymentTransaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a founder account so it can claim reservations.
    pub async fn add_founder(&self, founder_id: impl Into<String>, user_type: impl Into<String>) {
        self.inner
            .lock()
            .await
            .founders
            .insert(founder_id.into(), user_type.into());
    }

    pub async fn founder_user_type(&self, founder_id: &str) -> Option<String> {
        self.inner.lock().await.founders.get(founder_id).cloned()
    }

    pub async fn transactions(&self) -> Vec<PaymentTransaction> {
        self.inner.lock().await.transactions.clone()
    }

    /// Overwrite a stored row. Lets callers stage rows in states the public
    /// operations only reach over time (e.g. already expired).
    pub async fn replace(&self, reservation: PaymentReservation) {
        let mut state = self.inner.lock().await;
        if let Some(row) = state
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation.id)
        {
            *row = reservation;
        }
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn insert(&self, new: NewPaymentReservation) -> Result<PaymentReservation, StoreError> {
        let mut state = self.inner.lock().await;
        if state
            .reservations
            .iter()
            .any(|r| r.reservation_token == new.reservation_token)
        {
            return Err(StoreError::DuplicateToken);
        }
        if state
            .reservations
            .iter()
            .any(|r| r.order_reference == new.order_reference)
        {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "duplicate order reference {}",
                new.order_reference
            ))));
        }
        let row = PaymentReservation::from_new(new, OffsetDateTime::now_utc());
        state.reservations.push(row.clone());
        Ok(row)
    }

    async fn find_by_order_reference(
        &self,
        order_reference: &str,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        let state = self.inner.lock().await;
        Ok(state
            .reservations
            .iter()
            .find(|r| r.order_reference == order_reference)
            .cloned())
    }

    async fn find_by_token(
        &self,
        reservation_token: &str,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        let state = self.inner.lock().await;
        Ok(state
            .reservations
            .iter()
            .find(|r| r.reservation_token == reservation_token)
            .cloned())
    }

    async fn apply_transition(
        &self,
        transition: ReservationTransition,
    ) -> Result<Option<PaymentReservation>, StoreError> {
        let mut state = self.inner.lock().await;
        let Some(row) = state
            .reservations
            .iter_mut()
            .find(|r| r.order_reference == transition.order_reference)
        else {
            return Ok(None);
        };
        if transition.apply_to(row, OffsetDateTime::now_utc()) {
            Ok(Some(row.clone()))
        } else {
            Ok(None)
        }
    }

    async fn claim(
        &self,
        reservation_token: &str,
        founder_id: &str,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        let Some(row) = state
            .reservations
            .iter_mut()
            .find(|r| r.reservation_token == reservation_token)
        else {
            return Ok(ClaimOutcome::Rejected(TokenRejection::NotFound));
        };
        if let Some(rejection) = row.claim_rejection(now) {
            return Ok(ClaimOutcome::Rejected(rejection));
        }
        let Some(founder_user_type) = state.founders.get_mut(founder_id) else {
            return Ok(ClaimOutcome::FounderNotFound);
        };

        row.status = PaymentStatus::Claimed;
        row.claimed_by_founder_id = Some(founder_id.to_string());
        row.claimed_at = Some(now);
        row.updated_at = now;
        *founder_user_type = row.user_type.clone();

        let reservation = row.clone();
        let transaction = PaymentTransaction::for_claim(&reservation, founder_id, now);
        state.transactions.push(transaction.clone());

        Ok(ClaimOutcome::Claimed {
            reservation,
            transaction,
        })
    }

    async fn list(&self, filter: ReservationFilter) -> Result<Vec<PaymentReservation>, StoreError> {
        let state = self.inner.lock().await;
        let email = filter.email.map(|e| e.to_ascii_lowercase());
        let mut rows: Vec<PaymentReservation> = state
            .reservations
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| email.as_deref().is_none_or(|e| r.email == e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(0))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .collect())
    }

    async fn expire_abandoned(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut state = self.inner.lock().await;
        let mut expired = 0;
        for row in state.reservations.iter_mut() {
            if row.status.can_transition_to(PaymentStatus::Expired) && row.is_expired_at(now) {
                row.status = PaymentStatus::Expired;
                row.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}
