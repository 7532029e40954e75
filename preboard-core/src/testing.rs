//! In-process doubles shared by the unit tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use url::Url;

use crate::config::{CheckoutConfig, ConfigStore, FrontendConfig};
use crate::currency::FixedRateConverter;
use crate::entities::PaymentStatus;
use crate::entities::payment_reservation::{NewPaymentReservation, PaymentReservation};
use crate::gateway::{CreateOrderRequest, CreatedOrder, GatewayError, PaymentGateway};
use crate::notifier::{EmailMessage, EmailNotifier, NotifierError};
use crate::utils::identifiers::{generate_order_reference, generate_reservation_token};

pub fn sample_reservation(status: PaymentStatus) -> PaymentReservation {
    let now = OffsetDateTime::now_utc();
    let mut row = PaymentReservation::from_new(new_reservation("jane@example.com"), now);
    row.status = status;
    row
}

pub fn new_reservation(email: &str) -> NewPaymentReservation {
    let now = OffsetDateTime::now_utc();
    NewPaymentReservation {
        email: email.to_string(),
        name: "Jane Doe".to_string(),
        phone: None,
        reservation_token: generate_reservation_token(),
        order_reference: generate_order_reference(now),
        amount: Decimal::new(9900, 2),
        currency: "USD".to_string(),
        settlement_amount: Some(Decimal::new(36358, 2)),
        settlement_currency: Some("AED".to_string()),
        gateway: "mock".to_string(),
        gateway_order_ref: Some("GW-1".to_string()),
        payment_url: Some("https://pay.example.com/GW-1".to_string()),
        user_type: "individual".to_string(),
        utm: Default::default(),
        expires_at: now + Duration::days(30),
    }
}

pub fn aed_converter() -> FixedRateConverter {
    FixedRateConverter::new().with_rate("USD", "AED", Decimal::from_str("3.6725").unwrap())
}

pub fn checkout_config() -> ConfigStore<CheckoutConfig> {
    let base = Url::parse("https://api.example.com").unwrap();
    let mut config = CheckoutConfig::with_public_base_url(&base).unwrap();
    config.user_types.push("team".to_string());
    ConfigStore::new(config)
}

pub fn frontend_config() -> ConfigStore<FrontendConfig> {
    let base = Url::parse("https://app.example.com").unwrap();
    ConfigStore::new(FrontendConfig::new(base))
}

/// What the mock gateway answers with.
#[derive(Debug, Clone)]
pub enum MockGatewayBehavior {
    Succeed,
    MissingUrl,
    Reject,
}

pub struct MockGateway {
    behavior: MockGatewayBehavior,
    pub requests: Mutex<Vec<CreateOrderRequest>>,
}

impl MockGateway {
    pub fn new(behavior: MockGatewayBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<CreatedOrder, GatewayError> {
        let cart_id = request.order_reference.clone();
        self.requests.lock().await.push(request);
        match self.behavior {
            MockGatewayBehavior::Succeed => Ok(CreatedOrder {
                gateway_order_ref: Some(format!("GW-{cart_id}")),
                payment_url: Some(format!("https://pay.example.com/{cart_id}")),
            }),
            MockGatewayBehavior::MissingUrl => Ok(CreatedOrder {
                gateway_order_ref: Some(format!("GW-{cart_id}")),
                payment_url: None,
            }),
            MockGatewayBehavior::Reject => Err(GatewayError::Rejected {
                message: "Invalid store".to_string(),
                note: None,
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub attempts: AtomicUsize,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_email(&self, message: EmailMessage) -> Result<(), NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifierError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}
