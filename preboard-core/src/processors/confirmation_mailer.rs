//! ConfirmationMailer processor.
//!
//! Receives `PaymentCompleted` events and emails the applicant their
//! reservation token together with a link into onboarding. Delivery is
//! best effort: a failed send is logged and never touches reservation state.

use crate::config::{ConfigStore, FrontendConfig};
use crate::entities::payment_reservation::PaymentReservation;
use crate::events::{ReservationEvent, ReservationEventReceiver};
use crate::notifier::{EmailMessage, EmailNotifier, NotifierError};
use crate::store::{ReservationStore, StoreError};
use kanau::processor::Processor;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub const DEFAULT_CONFIRMATION_SUBJECT: &str = "Your founder spot is reserved";

/// Email settings, reloadable on SIGHUP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub subject: String,
    /// Provider template; plain text is sent when unset.
    pub template_id: Option<String>,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_CONFIRMATION_SUBJECT.to_string(),
            template_id: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("email delivery failed: {0}")]
    Delivery(#[from] NotifierError),
}

/// Build the confirmation email for a paid reservation.
pub fn confirmation_message(
    reservation: &PaymentReservation,
    config: &MailerConfig,
    frontend: &FrontendConfig,
) -> EmailMessage {
    let onboarding_url = frontend.onboarding_url(&reservation.reservation_token);
    let text_body = format!(
        "Hi {name},\n\n\
         Your payment was received and your founder spot is reserved.\n\n\
         Reservation token: {token}\n\n\
         Continue onboarding here: {url}\n\n\
         Keep this token safe; you will need it to finish signing up.\n",
        name = reservation.name,
        token = reservation.reservation_token,
        url = onboarding_url,
    );

    EmailMessage {
        to_email: reservation.email.clone(),
        to_name: reservation.name.clone(),
        subject: config.subject.clone(),
        template_id: config.template_id.clone(),
        template_data: json!({
            "name": reservation.name,
            "reservationToken": reservation.reservation_token,
            "orderReference": reservation.order_reference,
            "onboardingUrl": onboarding_url.as_str(),
            "amount": reservation.amount.to_string(),
            "currency": reservation.currency,
            "expiresAt": reservation.expires_at.unix_timestamp(),
        }),
        text_body,
    }
}

/// ConfirmationMailer sends one email per completed payment.
pub struct ConfirmationMailer {
    store: Arc<dyn ReservationStore>,
    notifier: Arc<dyn EmailNotifier>,
    mailer_config: ConfigStore<MailerConfig>,
    frontend: ConfigStore<FrontendConfig>,
}

impl ConfirmationMailer {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        notifier: Arc<dyn EmailNotifier>,
        mailer_config: ConfigStore<MailerConfig>,
        frontend: ConfigStore<FrontendConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            mailer_config,
            frontend,
        }
    }

    /// Run until shutdown is signaled or every event sender is gone.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut event_rx: ReservationEventReceiver) {
        info!("ConfirmationMailer started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("ConfirmationMailer received shutdown signal");
                        break;
                    }
                }

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        info!("ReservationEvent channel closed");
                        break;
                    };
                    debug!(?event, "Received ReservationEvent");
                    let order_reference = event.order_reference().to_string();
                    if let Err(e) = self.process(event).await {
                        error!(error = %e, %order_reference, "Failed to send confirmation email");
                    }
                }
            }
        }

        info!("ConfirmationMailer shutdown complete");
    }
}

impl Processor<ReservationEvent> for ConfirmationMailer {
    type Output = ();
    type Error = MailerError;

    async fn process(&self, event: ReservationEvent) -> Result<(), MailerError> {
        let ReservationEvent::PaymentCompleted { order_reference } = event;

        let reservation = self
            .store
            .find_by_order_reference(&order_reference)
            .await?
            .ok_or_else(|| MailerError::ReservationNotFound(order_reference.clone()))?;

        let message = {
            let config = self.mailer_config.read().await;
            let frontend = self.frontend.read().await;
            confirmation_message(&reservation, &config, &frontend)
        };
        self.notifier.send_email(message).await?;

        info!(%order_reference, "Confirmation email sent");
        Ok(())
    }
}
