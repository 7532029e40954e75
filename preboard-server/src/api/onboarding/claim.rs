use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use preboard_core::entities::payment_reservation::TokenRejection;
use preboard_core::services::ClaimError;
use preboard_sdk::objects::{ClaimRequest, ClaimResponse};

use crate::state::AppState;

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ClaimResponse {
            success: false,
            user_type: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// `POST /claim`: bind a paid reservation to a founder account.
///
/// Not found is a `404`, any other rejection a `409`.
pub(super) async fn claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected claim request body");
            return failure(
                StatusCode::BAD_REQUEST,
                "Reservation token and founder ID are required",
            );
        }
    };

    match state
        .claims
        .claim(&request.reservation_token, &request.founder_id)
        .await
    {
        Ok(claimed) => Json(ClaimResponse {
            success: true,
            user_type: Some(claimed.reservation.user_type),
            error: None,
        })
        .into_response(),
        Err(ClaimError::Rejected(TokenRejection::NotFound)) => {
            failure(StatusCode::NOT_FOUND, TokenRejection::NotFound.to_string())
        }
        Err(ClaimError::Rejected(rejection)) => failure(StatusCode::CONFLICT, rejection.to_string()),
        Err(ClaimError::InvalidInput(message)) => failure(StatusCode::BAD_REQUEST, message),
        Err(ClaimError::FounderNotFound) => failure(StatusCode::NOT_FOUND, "Founder not found"),
        Err(e) => {
            tracing::error!(error = %e, "Claim failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}
