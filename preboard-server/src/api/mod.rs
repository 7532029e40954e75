//! HTTP API, mounted under `/api/v1`.

use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod extractors;
pub mod onboarding;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/payment/pre-onboarding", onboarding::router())
        .nest("/admin", admin::router())
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, Bytes},
        http::{HeaderMap, Request, StatusCode, header},
    };
    use preboard_core::config::{
        AdminConfig, CheckoutConfig, FrontendConfig, ServerConfig, SharedConfig,
    };
    use preboard_core::currency::FixedRateConverter;
    use preboard_core::entities::PaymentStatus;
    use preboard_core::events::{ReservationEventReceiver, reservation_event_channel};
    use preboard_core::gateway::{CreateOrderRequest, CreatedOrder, GatewayError, PaymentGateway};
    use preboard_core::processors::{MailerConfig, SweeperConfig};
    use preboard_core::services::{ClaimService, InitiationService, TransitionService};
    use preboard_core::store::{MemoryStore, ReservationStore};
    use preboard_sdk::ADMIN_AUTH_HEADER;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use url::Url;

    const ADMIN_SECRET: &str = "ops-secret";

    struct StubGateway;

    #[async_trait]
    impl PaymentGateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        async fn create_order(&self, request: CreateOrderRequest) -> Result<CreatedOrder, GatewayError> {
            Ok(CreatedOrder {
                gateway_order_ref: Some(format!("GW-{}", request.order_reference)),
                payment_url: Some(format!("https://pay.example.com/{}", request.order_reference)),
            })
        }
    }

    struct TestApp {
        router: Router,
        store: MemoryStore,
        events_rx: ReservationEventReceiver,
    }

    fn test_app() -> TestApp {
        let store = MemoryStore::new();
        let shared_store: Arc<dyn ReservationStore> = Arc::new(store.clone());
        let (events_tx, events_rx) = reservation_event_channel();

        let public_base_url = Url::parse("https://api.example.com").unwrap();
        let mut checkout = CheckoutConfig::with_public_base_url(&public_base_url).unwrap();
        checkout.user_types.push("team".to_string());
        let salt = SaltString::generate(&mut OsRng);
        let secret_hash = Argon2::default()
            .hash_password(ADMIN_SECRET.as_bytes(), &salt)
            .unwrap()
            .to_string();
        let config = SharedConfig::new(
            ServerConfig {
                listen: "127.0.0.1:0".parse().unwrap(),
                public_base_url,
            },
            AdminConfig::new(secret_hash),
            FrontendConfig::new(Url::parse("https://app.example.com").unwrap()),
            checkout,
            MailerConfig::default(),
            SweeperConfig::default(),
        );

        let converter =
            FixedRateConverter::new().with_rate("USD", "AED", Decimal::new(36725, 4));
        let state = AppState::new(
            shared_store.clone(),
            InitiationService::new(
                shared_store.clone(),
                Arc::new(StubGateway),
                Arc::new(converter),
                config.checkout.clone(),
            ),
            TransitionService::new(shared_store.clone(), events_tx),
            ClaimService::new(shared_store),
            config,
        );

        TestApp {
            router: build_router(state),
            store,
            events_rx,
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, headers, body)
        }

        async fn send_json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, _, body) = self.send(request).await;
            (status, serde_json::from_slice(&body).unwrap())
        }

        async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, _, body) = self.send(request).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }

        /// Initiate a reservation and return `(order_reference, reservation_token)`.
        async fn initiate(&self) -> (String, String) {
            let (status, body) = self
                .send_json(
                    "POST",
                    "/api/v1/payment/pre-onboarding/initiate",
                    json!({ "email": "Jane@Example.com", "name": "Jane Doe", "userType": "team", "utmSource": "ads" }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            (
                body["orderReference"].as_str().unwrap().to_string(),
                body["reservationToken"].as_str().unwrap().to_string(),
            )
        }

        async fn callback_form(&self, form: String) -> StatusCode {
            let request = Request::builder()
                .method("POST")
                .uri("/api/v1/payment/pre-onboarding/callback")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap();
            self.send(request).await.0
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = app.get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_initiate_returns_checkout_url() {
        let app = test_app();
        let (order_reference, token) = app.initiate().await;

        let row = app.store.find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(row.order_reference, order_reference);
        assert_eq!(row.status, PaymentStatus::Pending);
        assert_eq!(row.email, "jane@example.com");
        assert_eq!(row.utm_source.as_deref(), Some("ads"));
        assert_eq!(row.settlement_currency.as_deref(), Some("AED"));
    }

    #[tokio::test]
    async fn test_initiate_rejects_bad_input() {
        let app = test_app();
        let (status, body) = app
            .send_json(
                "POST",
                "/api/v1/payment/pre-onboarding/initiate",
                json!({ "email": "nope", "name": "Jane" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let (status, body) = app
            .send_json("POST", "/api/v1/payment/pre-onboarding/initiate", json!({ "name": "Jane" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = app
            .send_json(
                "POST",
                "/api/v1/payment/pre-onboarding/initiate",
                json!({ "email": "jane@example.com", "name": "Jane", "userType": "superadmin" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown product variant");
    }

    #[tokio::test]
    async fn test_callback_always_ok_and_completes_once() {
        let mut app = test_app();
        let (order_reference, token) = app.initiate().await;

        let form = format!("cart_id={order_reference}&payment_result%5Bresponse_status%5D=A&tran_ref=T9");
        assert_eq!(app.callback_form(form.clone()).await, StatusCode::OK);
        assert_eq!(app.callback_form(form).await, StatusCode::OK);
        assert_eq!(app.callback_form("garbage".to_string()).await, StatusCode::OK);
        assert_eq!(
            app.callback_form("cart_id=SC-PRE-0_missing&respStatus=A".to_string()).await,
            StatusCode::OK
        );

        let row = app.store.find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(row.status, PaymentStatus::Completed);
        assert_eq!(row.gateway_transaction_id.as_deref(), Some("T9"));
        assert!(app.events_rx.try_recv().is_ok());
        assert!(app.events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_return_redirects_top_level_navigation() {
        let app = test_app();
        let (order_reference, token) = app.initiate().await;

        let request = Request::builder()
            .uri(format!(
                "/api/v1/payment/pre-onboarding/return?cartId={order_reference}&respStatus=A"
            ))
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = app.send(request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        let location = headers[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://app.example.com/onboarding/payment/success?"));
        assert!(location.contains(&format!("token={token}")));
    }

    #[tokio::test]
    async fn test_return_page_in_iframe() {
        let app = test_app();
        let (order_reference, _) = app.initiate().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/payment/pre-onboarding/return")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("sec-fetch-dest", "iframe")
            .body(Body::from(format!("cart_id={order_reference}&respStatus=H")))
            .unwrap();
        let (status, headers, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("PAYMENT_PENDING"));
        assert!(page.contains("postMessage"));

        let row = app
            .store
            .find_by_order_reference(&order_reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, PaymentStatus::Processing);
    }

    #[tokio::test]
    async fn test_return_error_outcomes() {
        let app = test_app();

        let request = Request::builder()
            .uri("/api/v1/payment/pre-onboarding/return?respStatus=A")
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("Missing order reference"));

        let request = Request::builder()
            .uri("/api/v1/payment/pre-onboarding/return?cart_id=SC-PRE-0_missing&respStatus=A")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(&body).contains("Payment not found"));
    }

    #[tokio::test]
    async fn test_validate_and_claim_flow() {
        let app = test_app();
        app.store.add_founder("founder-7", "individual").await;
        let (order_reference, token) = app.initiate().await;
        let validate_uri = format!("/api/v1/payment/pre-onboarding/validate/{token}");
        let claim_uri = "/api/v1/payment/pre-onboarding/claim";

        let (status, body) = app.get_json(&validate_uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["error"], "Payment has not been completed");

        app.callback_form(format!("cart_id={order_reference}&respCode=0")).await;

        let (status, body) = app.get_json(&validate_uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["email"], "jane@example.com");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["paymentType"], "pre_onboarding");
        assert_eq!(body["userType"], "team");

        let (status, body) = app
            .send_json("POST", claim_uri, json!({ "reservationToken": token, "founderId": "ghost" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Founder not found");

        let (status, body) = app
            .send_json("POST", claim_uri, json!({ "reservationToken": token, "founderId": "founder-7" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "userType": "team" }));
        assert_eq!(app.store.founder_user_type("founder-7").await.as_deref(), Some("team"));

        let (status, body) = app
            .send_json("POST", claim_uri, json!({ "reservationToken": token, "founderId": "founder-7" }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Reservation has already been claimed");

        let (_, body) = app.get_json(&validate_uri).await;
        assert_eq!(body["error"], "Reservation has already been claimed");

        let (status, body) = app
            .get_json("/api/v1/payment/pre-onboarding/validate/SC-PAY-ZZZZZZZZZZ")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Reservation token not found");
    }

    #[tokio::test]
    async fn test_admin_requires_secret() {
        let app = test_app();
        let (order_reference, _) = app.initiate().await;

        let (status, _) = app.get_json("/api/v1/admin/reservations").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/admin/reservations")
            .header(ADMIN_AUTH_HEADER, "wrong")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.0, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/admin/reservations?status=pending&email=JANE@example.com")
            .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let list: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["order_reference"], order_reference.as_str());

        let request = Request::builder()
            .uri(format!("/api/v1/admin/reservations/{order_reference}"))
            .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.0, StatusCode::OK);

        let request = Request::builder()
            .uri("/api/v1/admin/reservations/SC-PRE-0_missing")
            .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.0, StatusCode::NOT_FOUND);
    }
}
