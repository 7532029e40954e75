//! Custom Axum extractors for request authentication.
//!
//! Provides `AdminAuth`, which checks the plaintext secret in the
//! `Preboard-Admin-Authorization` header against the configured argon2 hash.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use preboard_sdk::ADMIN_AUTH_HEADER;

use crate::state::AppState;

/// Marker extractor: the request carried a valid admin secret.
pub struct AdminAuth;

#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    #[error("missing Preboard-Admin-Authorization header")]
    MissingHeader,
    #[error("invalid Preboard-Admin-Authorization header")]
    InvalidHeader,
    #[error("admin secret verification failed")]
    VerificationFailed,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminAuthError::InvalidHeader => StatusCode::BAD_REQUEST,
            AdminAuthError::MissingHeader | AdminAuthError::VerificationFailed => {
                StatusCode::UNAUTHORIZED
            }
        };
        (status, self.to_string()).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?
            .to_owned();

        let admin = state.config.admin.read().await.clone();

        // argon2 verification is CPU-bound; run it on the blocking pool.
        let verified = tokio::task::spawn_blocking(move || admin.verify_secret(&secret))
            .await
            .unwrap_or(false);

        if verified {
            Ok(AdminAuth)
        } else {
            tracing::warn!("Admin API request with invalid secret");
            Err(AdminAuthError::VerificationFailed)
        }
    }
}
