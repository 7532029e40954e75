//! Payment initiation: price conversion, gateway order, `pending` row.

use std::sync::Arc;

use preboard_sdk::objects::{InitiatePaymentRequest, UtmParameters};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::{CheckoutConfig, ConfigStore, PRICE_CURRENCY};
use crate::currency::{CurrencyConverter, CurrencyError};
use crate::entities::payment_reservation::NewPaymentReservation;
use crate::gateway::{
    CreateOrderRequest, CustomerDetails, GatewayError, PaymentGateway, ReturnUrls,
};
use crate::store::{ReservationStore, StoreError};
use crate::utils::identifiers::{generate_order_reference, generate_reservation_token};
use crate::utils::validation::{is_valid_email, non_blank, normalize_email};

/// Inserts attempted before a token collision is reported as a failure.
const MAX_TOKEN_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum InitiationError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("currency conversion failed: {0}")]
    Currency(#[from] CurrencyError),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("payment gateway returned no checkout URL")]
    MissingPaymentUrl,

    #[error("reservation lifetime overflows the calendar")]
    ExpiryOutOfRange,

    #[error("failed to store reservation: {0}")]
    Store(#[from] StoreError),
}

impl InitiationError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, InitiationError::InvalidInput(_))
    }

    /// Message safe to show the applicant.
    pub fn public_message(&self) -> &'static str {
        match self {
            InitiationError::InvalidInput(message) => *message,
            InitiationError::Currency(_) => "Unable to calculate the payment amount",
            InitiationError::Gateway(_) | InitiationError::MissingPaymentUrl => {
                "Unable to create payment session"
            }
            InitiationError::Store(_) | InitiationError::ExpiryOutOfRange => {
                "Unable to save reservation"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedPayment {
    pub payment_url: String,
    pub reservation_token: String,
    pub order_reference: String,
}

pub struct InitiationService {
    store: Arc<dyn ReservationStore>,
    gateway: Arc<dyn PaymentGateway>,
    converter: Arc<dyn CurrencyConverter>,
    checkout: ConfigStore<CheckoutConfig>,
}

fn clean_utm(utm: UtmParameters) -> UtmParameters {
    UtmParameters {
        utm_source: non_blank(utm.utm_source),
        utm_medium: non_blank(utm.utm_medium),
        utm_campaign: non_blank(utm.utm_campaign),
        utm_content: non_blank(utm.utm_content),
        utm_term: non_blank(utm.utm_term),
    }
}

impl InitiationService {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        gateway: Arc<dyn PaymentGateway>,
        converter: Arc<dyn CurrencyConverter>,
        checkout: ConfigStore<CheckoutConfig>,
    ) -> Self {
        Self {
            store,
            gateway,
            converter,
            checkout,
        }
    }

    /// Start a reservation.
    ///
    /// Nothing is persisted unless the gateway hands back a checkout URL.
    #[tracing::instrument(skip_all, err)]
    pub async fn initiate(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatedPayment, InitiationError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(InitiationError::InvalidInput("A valid email address is required"));
        }
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(InitiationError::InvalidInput("Name is required"));
        }
        let phone = non_blank(request.phone);

        let checkout = self.checkout.snapshot().await;
        let user_type =
            non_blank(request.user_type).unwrap_or_else(|| checkout.default_user_type.clone());
        if !checkout.offers_user_type(&user_type) {
            return Err(InitiationError::InvalidInput("Unknown product variant"));
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(checkout.reservation_ttl)
            .ok_or(InitiationError::ExpiryOutOfRange)?;
        let mut reservation_token = generate_reservation_token();
        let order_reference = generate_order_reference(now);

        let converted = self
            .converter
            .convert(checkout.price, PRICE_CURRENCY, &checkout.settlement_currency)
            .await?;

        let created = self
            .gateway
            .create_order(CreateOrderRequest {
                order_reference: order_reference.clone(),
                amount: converted.amount,
                currency: converted.currency.clone(),
                description: checkout.description.clone(),
                return_urls: ReturnUrls::single(checkout.return_url.clone()),
                callback_url: checkout.callback_url.clone(),
                customer: CustomerDetails {
                    email: email.clone(),
                    name: name.clone(),
                    phone: phone.clone(),
                },
            })
            .await?;
        let payment_url = created
            .payment_url
            .ok_or(InitiationError::MissingPaymentUrl)?;

        let utm = clean_utm(request.utm);
        let mut attempt = 1;
        loop {
            let new = NewPaymentReservation {
                email: email.clone(),
                name: name.clone(),
                phone: phone.clone(),
                reservation_token: reservation_token.clone(),
                order_reference: order_reference.clone(),
                amount: checkout.price,
                currency: PRICE_CURRENCY.to_string(),
                settlement_amount: Some(converted.amount),
                settlement_currency: Some(converted.currency.clone()),
                gateway: self.gateway.name().to_string(),
                gateway_order_ref: created.gateway_order_ref.clone(),
                payment_url: Some(payment_url.clone()),
                user_type: user_type.clone(),
                utm: utm.clone(),
                expires_at,
            };

            match self.store.insert(new).await {
                Ok(row) => {
                    info!(
                        order_reference = %row.order_reference,
                        settlement_amount = %converted.amount,
                        settlement_currency = %converted.currency,
                        "Payment reservation created"
                    );
                    return Ok(InitiatedPayment {
                        payment_url,
                        reservation_token: row.reservation_token,
                        order_reference: row.order_reference,
                    });
                }
                Err(StoreError::DuplicateToken) if attempt < MAX_TOKEN_ATTEMPTS => {
                    warn!(%order_reference, attempt, "Reservation token collision, regenerating");
                    reservation_token = generate_reservation_token();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::FixedRateConverter;
    use crate::entities::PaymentStatus;
    use crate::store::{MemoryStore, ReservationFilter};
    use crate::testing::{MockGateway, MockGatewayBehavior, aed_converter, checkout_config};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn request(email: &str, name: &str) -> InitiatePaymentRequest {
        InitiatePaymentRequest {
            email: email.to_string(),
            name: name.to_string(),
            phone: Some(" ".to_string()),
            user_type: None,
            utm: UtmParameters {
                utm_source: Some("newsletter".to_string()),
                utm_medium: Some("".to_string()),
                ..Default::default()
            },
        }
    }

    fn service(
        store: &MemoryStore,
        gateway: Arc<MockGateway>,
        converter: FixedRateConverter,
    ) -> InitiationService {
        InitiationService::new(
            Arc::new(store.clone()),
            gateway,
            Arc::new(converter),
            checkout_config(),
        )
    }

    async fn row_count(store: &MemoryStore) -> usize {
        store
            .list(ReservationFilter {
                limit: 100,
                ..Default::default()
            })
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_initiate_creates_pending_reservation() {
        let store = MemoryStore::new();
        let gateway = MockGateway::new(MockGatewayBehavior::Succeed);
        let service = service(&store, gateway.clone(), aed_converter());

        let initiated = service
            .initiate(request(" Jane@Example.com ", " Jane Doe "))
            .await
            .unwrap();

        let sent = gateway.requests.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_reference, initiated.order_reference);
        assert_eq!(sent[0].amount, Decimal::from_str("363.58").unwrap());
        assert_eq!(sent[0].currency, "AED");
        assert_eq!(sent[0].return_urls.authorised, sent[0].return_urls.declined);
        assert!(sent[0].callback_url.as_str().ends_with("/pre-onboarding/callback"));

        let row = store
            .find_by_token(&initiated.reservation_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, PaymentStatus::Pending);
        assert_eq!(row.email, "jane@example.com");
        assert_eq!(row.name, "Jane Doe");
        assert_eq!(row.phone, None);
        assert_eq!(row.amount, Decimal::new(9900, 2));
        assert_eq!(row.currency, "USD");
        assert_eq!(row.user_type, "individual");
        assert_eq!(row.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(row.utm_medium, None);
        assert_eq!(row.payment_url.as_deref(), Some(initiated.payment_url.as_str()));
        let ttl_drift = row.expires_at - row.created_at - time::Duration::days(30);
        assert!(ttl_drift.abs() < time::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_gateway_failure_writes_no_row() {
        let store = MemoryStore::new();
        let service = service(
            &store,
            MockGateway::new(MockGatewayBehavior::Reject),
            aed_converter(),
        );

        let err = service
            .initiate(request("jane@example.com", "Jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, InitiationError::Gateway(_)));
        assert!(!err.is_invalid_input());
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_missing_checkout_url_writes_no_row() {
        let store = MemoryStore::new();
        let service = service(
            &store,
            MockGateway::new(MockGatewayBehavior::MissingUrl),
            aed_converter(),
        );

        let err = service
            .initiate(request("jane@example.com", "Jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, InitiationError::MissingPaymentUrl));
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_conversion_failure_skips_gateway() {
        let store = MemoryStore::new();
        let gateway = MockGateway::new(MockGatewayBehavior::Succeed);
        let service = service(&store, gateway.clone(), FixedRateConverter::new());

        let err = service
            .initiate(request("jane@example.com", "Jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, InitiationError::Currency(_)));
        assert!(gateway.requests.lock().await.is_empty());
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_side_effects() {
        let store = MemoryStore::new();
        let gateway = MockGateway::new(MockGatewayBehavior::Succeed);
        let service = service(&store, gateway.clone(), aed_converter());

        let err = service.initiate(request("not-an-email", "Jane")).await.unwrap_err();
        assert!(err.is_invalid_input());
        let err = service.initiate(request("jane@example.com", "  ")).await.unwrap_err();
        assert_eq!(err.public_message(), "Name is required");

        assert!(gateway.requests.lock().await.is_empty());
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_requested_user_type_is_kept() {
        let store = MemoryStore::new();
        let service = service(
            &store,
            MockGateway::new(MockGatewayBehavior::Succeed),
            aed_converter(),
        );
        let mut req = request("team@example.com", "Team Lead");
        req.user_type = Some("team".to_string());

        let initiated = service.initiate(req).await.unwrap();
        let row = store
            .find_by_order_reference(&initiated.order_reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.user_type, "team");
    }

    #[tokio::test]
    async fn test_unoffered_user_type_rejected() {
        let store = MemoryStore::new();
        let gateway = MockGateway::new(MockGatewayBehavior::Succeed);
        let service = service(&store, gateway.clone(), aed_converter());

        for user_type in ["superadmin".to_string(), "x".repeat(100_000)] {
            let mut req = request("jane@example.com", "Jane");
            req.user_type = Some(user_type);
            let err = service.initiate(req).await.unwrap_err();
            assert!(err.is_invalid_input());
            assert_eq!(err.public_message(), "Unknown product variant");
        }

        assert!(gateway.requests.lock().await.is_empty());
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_ttl_fails_before_gateway() {
        let store = MemoryStore::new();
        let gateway = MockGateway::new(MockGatewayBehavior::Succeed);
        let checkout = checkout_config();
        let mut config = checkout.snapshot().await;
        config.reservation_ttl = time::Duration::days(4_000_000);
        checkout.update(config).await;
        let service = InitiationService::new(
            Arc::new(store.clone()),
            gateway.clone(),
            Arc::new(aed_converter()),
            checkout,
        );

        let err = service
            .initiate(request("jane@example.com", "Jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, InitiationError::ExpiryOutOfRange));
        assert!(!err.is_invalid_input());
        assert!(gateway.requests.lock().await.is_empty());
        assert_eq!(row_count(&store).await, 0);
    }
}
