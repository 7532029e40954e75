//! Pre-onboarding payment API.
//!
//! Called by the onboarding frontend, the payment gateway (callback) and the
//! applicant's browser (return).
//!
//! # Endpoints
//!
//! - `POST     /initiate`          – create a reservation and a hosted payment session
//! - `POST     /callback`          – gateway webhook, always answered with `200 OK`
//! - `GET/POST /return`            – browser return from the hosted page
//! - `GET      /validate/{token}`  – check whether a token can be claimed
//! - `POST     /claim`             – bind a paid reservation to a founder

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod callback;
mod claim;
mod initiate;
pub(crate) mod payload;
mod return_page;
mod validate;

/// Build the onboarding payment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate::initiate))
        .route("/callback", post(callback::callback))
        .route(
            "/return",
            get(return_page::handle_return).post(return_page::handle_return),
        )
        .route("/validate/{token}", get(validate::validate_token))
        .route("/claim", post(claim::claim))
}
