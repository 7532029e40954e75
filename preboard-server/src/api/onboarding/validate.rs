use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use preboard_core::services::ClaimError;
use preboard_sdk::objects::{PRE_ONBOARDING_PAYMENT_TYPE, ValidateTokenResponse};

use crate::state::AppState;

/// `GET /validate/{token}`: read-only claimability check.
///
/// Rejections are answered with `200` and `{valid: false, error}`; only
/// storage failures are a `500`.
pub(super) async fn validate_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    match state.claims.validate_token(&token).await {
        Ok(reservation) => Json(ValidateTokenResponse {
            valid: true,
            email: Some(reservation.email),
            name: Some(reservation.name),
            status: Some(reservation.status.into()),
            payment_type: Some(PRE_ONBOARDING_PAYMENT_TYPE.to_string()),
            user_type: Some(reservation.user_type),
            error: None,
        })
        .into_response(),
        Err(ClaimError::Rejected(rejection)) => {
            Json(ValidateTokenResponse::invalid(rejection.to_string())).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Token validation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ValidateTokenResponse::invalid("Internal error")),
            )
                .into_response()
        }
    }
}
