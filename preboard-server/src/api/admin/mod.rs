//! Admin API handlers.
//!
//! These endpoints are called by the operations dashboard and require the
//! `Preboard-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET /reservations`                   – list reservations (paginated, filterable)
//! - `GET /reservations/{order_reference}` – one reservation including the raw gateway payload

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use preboard_core::entities::payment_reservation::PaymentReservation;
use preboard_core::store::StoreError;
use preboard_sdk::objects::admin::AdminReservationResponse;

use crate::state::AppState;

mod get_reservation;
mod list_reservations;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations::list_reservations))
        .route(
            "/reservations/{order_reference}",
            get(get_reservation::get_reservation),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Store(StoreError),
    NotFound,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Store(e) => {
                tracing::error!(error = %e, "Admin API store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "reservation not found").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// `list` omits the raw gateway payload to keep pages small.
pub(crate) fn reservation_to_admin_response(
    r: &PaymentReservation,
    include_gateway_response: bool,
) -> AdminReservationResponse {
    AdminReservationResponse {
        id: r.id,
        email: r.email.clone(),
        name: r.name.clone(),
        phone: r.phone.clone(),
        reservation_token: r.reservation_token.clone(),
        order_reference: r.order_reference.clone(),
        amount: r.amount,
        currency: r.currency.clone(),
        settlement_amount: r.settlement_amount,
        settlement_currency: r.settlement_currency.clone(),
        gateway: r.gateway.clone(),
        gateway_order_ref: r.gateway_order_ref.clone(),
        gateway_transaction_id: r.gateway_transaction_id.clone(),
        payment_url: r.payment_url.clone(),
        status: r.status.into(),
        user_type: r.user_type.clone(),
        utm: r.utm(),
        created_at: r.created_at.unix_timestamp(),
        expires_at: r.expires_at.unix_timestamp(),
        claimed_by_founder_id: r.claimed_by_founder_id.clone(),
        claimed_at: r.claimed_at.map(|t| t.unix_timestamp()),
        gateway_response: if include_gateway_response {
            r.gateway_response.clone()
        } else {
            None
        },
    }
}
