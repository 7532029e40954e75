//! Admin API client (operations dashboard → reservation server).
//!
//! All requests carry the plaintext admin secret in the
//! `Preboard-Admin-Authorization` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::ADMIN_AUTH_HEADER;
use crate::objects::admin::{AdminReservationResponse, ListReservationsQuery};

/// Typed HTTP client for the **Admin API**.
///
/// Authentication uses a plaintext secret verified server-side against an
/// argon2-hashed value.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the reservation server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/admin/reservations` – list reservations with optional filters.
    pub async fn list_reservations(
        &self,
        query: &ListReservationsQuery,
    ) -> Result<Vec<AdminReservationResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/reservations")?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/reservations/{order_reference}` – fetch one reservation.
    pub async fn get_reservation(
        &self,
        order_reference: &str,
    ) -> Result<AdminReservationResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/reservations/{order_reference}"))?;

        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }
}
