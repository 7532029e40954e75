//! Hosted-checkout payment gateway abstraction.

pub mod signal;
pub mod telr;

pub use signal::{GatewaySignal, SignalOutcome};
pub use telr::{DEFAULT_TELR_ENDPOINT, TelrConfig, TelrGateway};

use async_trait::async_trait;
use rust_decimal::Decimal;
use url::Url;

/// Browser return targets for the hosted page. All three usually point at
/// the same return endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrls {
    pub authorised: Url,
    pub declined: Url,
    pub cancelled: Url,
}

impl ReturnUrls {
    pub fn single(url: Url) -> Self {
        Self {
            authorised: url.clone(),
            declined: url.clone(),
            cancelled: url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    /// Our order reference, used as the gateway's cart id.
    pub order_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub return_urls: ReturnUrls,
    pub callback_url: Url,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    /// The gateway's own order reference.
    pub gateway_order_ref: Option<String>,
    /// Hosted checkout URL. A create call without one is unusable.
    pub payment_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("gateway rejected the order: {message}")]
    Rejected {
        message: String,
        note: Option<String>,
    },

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Short provider name stored on each reservation.
    fn name(&self) -> &str;

    async fn create_order(&self, request: CreateOrderRequest) -> Result<CreatedOrder, GatewayError>;
}
