//! Reservation persistence.
//!
//! [`ReservationStore`] is the seam between the services and the database.
//! Every state change goes through a conditional write so concurrent callers
//! (webhook vs. browser return, two claim attempts) cannot both win.

mod memory;
mod postgres;

pub use memory::MemoryStore;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::entities::PaymentStatus;
use crate::entities::payment_reservation::{
    NewPaymentReservation, PaymentReservation, ReservationTransition, TokenRejection,
};
use crate::entities::payment_transaction::PaymentTransaction;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The generated reservation token collided with an existing row.
    #[error("reservation token already exists")]
    DuplicateToken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed {
        reservation: PaymentReservation,
        transaction: PaymentTransaction,
    },
    Rejected(TokenRejection),
    /// The reservation was claimable but the founder does not exist; nothing was written.
    FounderNotFound,
}

/// Filters for listing reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<PaymentStatus>,
    pub email: Option<String>,
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Persist a new `pending` reservation.
    ///
    /// Fails with [`StoreError::DuplicateToken`] when the reservation token is taken.
    async fn insert(&self, new: NewPaymentReservation) -> Result<PaymentReservation, StoreError>;

    async fn find_by_order_reference(
        &self,
        order_reference: &str,
    ) -> Result<Option<PaymentReservation>, StoreError>;

    async fn find_by_token(
        &self,
        reservation_token: &str,
    ) -> Result<Option<PaymentReservation>, StoreError>;

    /// Apply `transition` if the row's current status allows it.
    ///
    /// Returns the updated row only when this call performed the write.
    async fn apply_transition(
        &self,
        transition: ReservationTransition,
    ) -> Result<Option<PaymentReservation>, StoreError>;

    /// Atomically claim a reservation for a founder.
    ///
    /// Marks the row claimed, copies `user_type` to the founder and writes the
    /// audit transaction, all or nothing.
    async fn claim(
        &self,
        reservation_token: &str,
        founder_id: &str,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError>;

    async fn list(&self, filter: ReservationFilter) -> Result<Vec<PaymentReservation>, StoreError>;

    /// Mark `pending`/`processing` rows past their expiry as `expired`.
    async fn expire_abandoned(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}
