//! Applying gateway signals to reservations.
//!
//! Both the server-to-server callback and the browser return land here. They
//! may arrive in any order and any number of times; the conditional write in
//! the store decides which one actually moves the row.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::entities::PaymentStatus;
use crate::entities::payment_reservation::{PaymentReservation, ReservationTransition};
use crate::events::{ReservationEvent, ReservationEventSender};
use crate::gateway::{GatewaySignal, SignalOutcome};
use crate::store::{ReservationStore, StoreError};

/// Where a signal came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Callback,
    Return,
}

impl SignalSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalSource::Callback => "callback",
            SignalSource::Return => "return",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("payload carries no order reference")]
    MissingOrderReference,

    #[error("no reservation with order reference {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// The row as it stands after this signal, whether or not it wrote.
    pub reservation: PaymentReservation,
    pub outcome: SignalOutcome,
    /// True when this call performed the write.
    pub applied: bool,
}

pub struct TransitionService {
    store: Arc<dyn ReservationStore>,
    events: ReservationEventSender,
}

impl TransitionService {
    pub fn new(store: Arc<dyn ReservationStore>, events: ReservationEventSender) -> Self {
        Self { store, events }
    }

    #[tracing::instrument(skip_all, err, fields(source = source.as_str()))]
    pub async fn apply_signal(
        &self,
        payload: Value,
        source: SignalSource,
    ) -> Result<TransitionResult, TransitionError> {
        let signal = GatewaySignal::from_payload(&payload);
        let order_reference = signal
            .order_reference
            .clone()
            .ok_or(TransitionError::MissingOrderReference)?;

        if signal.signals_disagree() {
            warn!(
                %order_reference,
                status = ?signal.status_letter,
                code = ?signal.response_code,
                "Gateway status letter and response code disagree"
            );
        }
        if signal.declined_by_code_only() {
            warn!(
                %order_reference,
                code = ?signal.response_code,
                "Gateway response code declined without a status letter"
            );
        }

        let outcome = signal.outcome();
        let target = outcome.target_status();
        let applied = self
            .store
            .apply_transition(ReservationTransition {
                order_reference: order_reference.clone(),
                target,
                gateway_transaction_id: signal.transaction_ref.clone(),
                gateway_response: payload,
            })
            .await?;

        let (reservation, applied) = match applied {
            Some(row) => (row, true),
            None => {
                let row = self
                    .store
                    .find_by_order_reference(&order_reference)
                    .await?
                    .ok_or_else(|| TransitionError::NotFound(order_reference.clone()))?;
                (row, false)
            }
        };

        if applied {
            info!(
                %order_reference,
                status = %reservation.status,
                message = ?signal.message,
                "Reservation updated from gateway signal"
            );
            if target == Some(PaymentStatus::Completed) {
                self.emit_completed(&order_reference).await;
            }
        } else {
            debug!(
                %order_reference,
                status = %reservation.status,
                ?outcome,
                "Gateway signal did not change reservation"
            );
        }

        Ok(TransitionResult {
            reservation,
            outcome,
            applied,
        })
    }

    async fn emit_completed(&self, order_reference: &str) {
        let event = ReservationEvent::PaymentCompleted {
            order_reference: order_reference.to_string(),
        };
        if let Err(e) = self.events.send(event).await {
            error!(error = %e, order_reference, "Failed to queue completion event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::reservation_event_channel;
    use crate::store::MemoryStore;
    use crate::testing::new_reservation;
    use serde_json::json;

    async fn seeded() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let row = store.insert(new_reservation("jane@example.com")).await.unwrap();
        (store, row.order_reference)
    }

    #[tokio::test]
    async fn test_duplicate_and_racing_signals_emit_one_event() {
        let (store, order_reference) = seeded().await;
        let (tx, mut rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        let callback = json!({ "cart_id": order_reference, "respStatus": "A", "respCode": "0", "tranRef": "T1" });
        let browser = json!({
            "cartId": order_reference,
            "payment_result": { "response_status": "A", "response_code": 0 }
        });

        let (a, b) = tokio::join!(
            service.apply_signal(callback.clone(), SignalSource::Callback),
            service.apply_signal(browser, SignalSource::Return),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.applied ^ b.applied);
        assert_eq!(a.reservation.status, PaymentStatus::Completed);
        assert_eq!(b.reservation.status, PaymentStatus::Completed);

        let replay = service.apply_signal(callback, SignalSource::Callback).await.unwrap();
        assert!(!replay.applied);

        assert_eq!(
            rx.try_recv().unwrap(),
            ReservationEvent::PaymentCompleted {
                order_reference: order_reference.clone()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_code_only_decline_fails_reservation() {
        let (store, order_reference) = seeded().await;
        let (tx, mut rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        let result = service
            .apply_signal(json!({ "cart_id": order_reference, "respCode": "31" }), SignalSource::Callback)
            .await
            .unwrap();
        assert!(result.applied);
        assert_eq!(result.outcome, SignalOutcome::Failed);
        assert_eq!(result.reservation.status, PaymentStatus::Failed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_decline_does_not_regress_completed() {
        let (store, order_reference) = seeded().await;
        let (tx, _rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        service
            .apply_signal(json!({ "cart_id": order_reference, "respStatus": "A" }), SignalSource::Return)
            .await
            .unwrap();
        let late = service
            .apply_signal(
                json!({ "cart_id": order_reference, "respStatus": "D", "respCode": "31" }),
                SignalSource::Callback,
            )
            .await
            .unwrap();

        assert!(!late.applied);
        assert_eq!(late.outcome, SignalOutcome::Failed);
        assert_eq!(late.reservation.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_payment_can_still_complete() {
        let (store, order_reference) = seeded().await;
        let (tx, mut rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        let failed = service
            .apply_signal(json!({ "cart_id": order_reference, "respStatus": "D" }), SignalSource::Return)
            .await
            .unwrap();
        assert_eq!(failed.reservation.status, PaymentStatus::Failed);
        assert!(rx.try_recv().is_err());

        let retried = service
            .apply_signal(
                json!({ "cart_id": order_reference, "respCode": "0", "tranRef": "T2" }),
                SignalSource::Callback,
            )
            .await
            .unwrap();
        assert!(retried.applied);
        assert_eq!(retried.reservation.status, PaymentStatus::Completed);
        assert_eq!(retried.reservation.gateway_transaction_id.as_deref(), Some("T2"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_hold_then_complete() {
        let (store, order_reference) = seeded().await;
        let (tx, _rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        let held = service
            .apply_signal(json!({ "cart_id": order_reference, "respStatus": "H" }), SignalSource::Callback)
            .await
            .unwrap();
        assert_eq!(held.reservation.status, PaymentStatus::Processing);

        let done = service
            .apply_signal(json!({ "cart_id": order_reference, "respStatus": "A" }), SignalSource::Callback)
            .await
            .unwrap();
        assert_eq!(done.reservation.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_undetermined_signal_records_payload_only() {
        let (store, order_reference) = seeded().await;
        let (tx, _rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store.clone()), tx);

        let result = service
            .apply_signal(json!({ "cart_id": order_reference, "respStatus": "X" }), SignalSource::Return)
            .await
            .unwrap();
        assert!(result.applied);
        assert_eq!(result.reservation.status, PaymentStatus::Pending);
        assert_eq!(
            result.reservation.gateway_response,
            Some(json!({ "cart_id": order_reference, "respStatus": "X" }))
        );
    }

    #[tokio::test]
    async fn test_missing_and_unknown_order_reference() {
        let (store, _) = seeded().await;
        let (tx, _rx) = reservation_event_channel();
        let service = TransitionService::new(Arc::new(store), tx);

        let err = service
            .apply_signal(json!({ "respStatus": "A" }), SignalSource::Callback)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::MissingOrderReference));

        let err = service
            .apply_signal(json!({ "cart_id": "SC-PRE-0_missing", "respStatus": "A" }), SignalSource::Callback)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::NotFound(r) if r == "SC-PRE-0_missing"));
    }
}
