//! Onboarding API client (frontend backend → reservation server).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_envelope};
use crate::objects::{
    ClaimRequest, ClaimResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    ValidateTokenResponse,
};

/// Typed HTTP client for the pre-onboarding payment endpoints.
#[derive(Debug, Clone)]
pub struct OnboardingClient {
    http: Client,
    base_url: Url,
}

impl OnboardingClient {
    /// Create a new `OnboardingClient` rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/payment/pre-onboarding/initiate`
    pub async fn initiate(
        &self,
        request: &InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ClientError> {
        let url = self
            .base_url
            .join("/api/v1/payment/pre-onboarding/initiate")?;

        let resp = self.http.post(url).json(request).send().await?;
        parse_envelope(resp).await
    }

    /// `GET /api/v1/payment/pre-onboarding/validate/{token}`
    pub async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, ClientError> {
        let mut url = self
            .base_url
            .join("/api/v1/payment/pre-onboarding/validate/")?;
        url = url.join(token)?;

        let resp = self.http.get(url).send().await?;
        parse_envelope(resp).await
    }

    /// `POST /api/v1/payment/pre-onboarding/claim`
    pub async fn claim(
        &self,
        reservation_token: impl Into<String>,
        founder_id: impl Into<String>,
    ) -> Result<ClaimResponse, ClientError> {
        let url = self.base_url.join("/api/v1/payment/pre-onboarding/claim")?;
        let body = ClaimRequest {
            reservation_token: reservation_token.into(),
            founder_id: founder_id.into(),
        };

        let resp = self.http.post(url).json(&body).send().await?;
        parse_envelope(resp).await
    }
}
