use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use preboard_core::services::InitiationError;
use preboard_sdk::objects::{InitiatePaymentRequest, InitiatePaymentResponse};

use crate::state::AppState;

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(InitiatePaymentResponse::failed(message))).into_response()
}

/// `POST /initiate`: start a reservation and return the hosted checkout URL.
///
/// Invalid input is a `400`; upstream failures are `502` (gateway, rates) or
/// `500` (database). Every failure body is `{success: false, error}`.
pub(super) async fn initiate(
    State(state): State<AppState>,
    body: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected initiate request body");
            return failure(StatusCode::BAD_REQUEST, "Email and name are required");
        }
    };

    match state.initiation.initiate(request).await {
        Ok(initiated) => Json(InitiatePaymentResponse::succeeded(
            initiated.payment_url,
            initiated.reservation_token,
            initiated.order_reference,
        ))
        .into_response(),
        Err(e) => {
            let status = match &e {
                InitiationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                InitiationError::Currency(_)
                | InitiationError::Gateway(_)
                | InitiationError::MissingPaymentUrl => StatusCode::BAD_GATEWAY,
                InitiationError::Store(_) | InitiationError::ExpiryOutOfRange => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            if status.is_server_error() {
                tracing::error!(error = %e, "Payment initiation failed");
            }
            failure(status, e.public_message())
        }
    }
}
