//! Telr hosted payment page adapter.
//!
//! Orders are created with a single JSON POST to the order endpoint; the
//! response carries the gateway's order ref and the hosted page URL.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{CreateOrderRequest, CreatedOrder, GatewayError, PaymentGateway};

pub const DEFAULT_TELR_ENDPOINT: &str = "https://secure.telr.com/gateway/order.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct TelrConfig {
    pub store_id: String,
    pub auth_key: String,
    pub endpoint: Url,
    pub test_mode: bool,
}

impl std::fmt::Debug for TelrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelrConfig")
            .field("store_id", &self.store_id)
            .field("auth_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

pub struct TelrGateway {
    http: reqwest::Client,
    config: TelrConfig,
}

impl TelrGateway {
    pub fn new(config: TelrConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }
}

/// Split a display name into Telr's `forenames` / `surname` pair.
fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.rsplit_once(char::is_whitespace) {
        Some((forenames, surname)) => (forenames.trim().to_string(), surname.to_string()),
        None => (name.to_string(), name.to_string()),
    }
}

/// Build the `create` request body for an order.
pub fn build_order_payload(config: &TelrConfig, request: &CreateOrderRequest) -> Value {
    let (forenames, surname) = split_name(&request.customer.name);
    let mut customer = json!({
        "ref": request.customer.email,
        "email": request.customer.email,
        "name": { "forenames": forenames, "surname": surname },
    });
    if let Some(phone) = &request.customer.phone {
        customer["phone"] = Value::String(phone.clone());
    }

    json!({
        "method": "create",
        "store": config.store_id,
        "authkey": config.auth_key,
        "order": {
            "cartid": request.order_reference,
            "test": if config.test_mode { "1" } else { "0" },
            "amount": request.amount.round_dp(2).to_string(),
            "currency": request.currency,
            "description": request.description,
        },
        "return": {
            "authorised": request.return_urls.authorised.as_str(),
            "declined": request.return_urls.declined.as_str(),
            "cancelled": request.return_urls.cancelled.as_str(),
            "callback": request.callback_url.as_str(),
        },
        "customer": customer,
    })
}

/// Interpret the order endpoint's JSON response.
pub fn parse_order_response(body: &Value) -> Result<CreatedOrder, GatewayError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown gateway error")
            .to_string();
        let note = error
            .get("note")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(GatewayError::Rejected { message, note });
    }

    let order = body
        .get("order")
        .ok_or_else(|| GatewayError::InvalidResponse("missing `order` object".to_string()))?;

    let text = |key: &str| {
        order
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(CreatedOrder {
        gateway_order_ref: text("ref"),
        payment_url: text("url"),
    })
}

#[async_trait]
impl PaymentGateway for TelrGateway {
    fn name(&self) -> &str {
        "telr"
    }

    #[tracing::instrument(skip_all, err, fields(order_reference = %request.order_reference))]
    async fn create_order(&self, request: CreateOrderRequest) -> Result<CreatedOrder, GatewayError> {
        let payload = build_order_payload(&self.config, &request);

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Telr order creation failed");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let created = parse_order_response(&body)?;
        debug!(gateway_order_ref = ?created.gateway_order_ref, "Telr order created");
        Ok(created)
    }
}
