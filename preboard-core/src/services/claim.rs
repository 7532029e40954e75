//! Token validation and claiming.

use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::entities::payment_reservation::{PaymentReservation, TokenRejection};
use crate::entities::payment_transaction::PaymentTransaction;
use crate::store::{ClaimOutcome, ReservationStore, StoreError};
use crate::utils::identifiers::is_well_formed_token;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error(transparent)]
    Rejected(#[from] TokenRejection),

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Founder not found")]
    FounderNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ClaimedReservation {
    pub reservation: PaymentReservation,
    pub transaction: PaymentTransaction,
}

pub struct ClaimService {
    store: Arc<dyn ReservationStore>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Look up a token and check that it can still be claimed.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn validate_token(&self, token: &str) -> Result<PaymentReservation, ClaimError> {
        let token = token.trim();
        if !is_well_formed_token(token) {
            return Err(TokenRejection::NotFound.into());
        }
        let reservation = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(TokenRejection::NotFound)?;
        match reservation.claim_rejection(OffsetDateTime::now_utc()) {
            Some(rejection) => Err(rejection.into()),
            None => Ok(reservation),
        }
    }

    /// Bind a reservation to a founder. At most one call per token succeeds.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn claim(&self, token: &str, founder_id: &str) -> Result<ClaimedReservation, ClaimError> {
        let token = token.trim();
        let founder_id = founder_id.trim();
        if founder_id.is_empty() {
            return Err(ClaimError::InvalidInput("Founder ID is required"));
        }
        if !is_well_formed_token(token) {
            return Err(TokenRejection::NotFound.into());
        }

        match self
            .store
            .claim(token, founder_id, OffsetDateTime::now_utc())
            .await?
        {
            ClaimOutcome::Claimed {
                reservation,
                transaction,
            } => {
                info!(
                    order_reference = %reservation.order_reference,
                    founder_id,
                    user_type = %reservation.user_type,
                    "Reservation claimed"
                );
                Ok(ClaimedReservation {
                    reservation,
                    transaction,
                })
            }
            ClaimOutcome::Rejected(rejection) => Err(rejection.into()),
            ClaimOutcome::FounderNotFound => {
                warn!(founder_id, "Claim attempted for unknown founder");
                Err(ClaimError::FounderNotFound)
            }
        }
    }
}
