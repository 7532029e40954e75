use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
};
use preboard_core::services::SignalSource;

use super::payload::parse_gateway_payload;
use crate::state::AppState;

/// `POST /callback`: gateway webhook.
///
/// Always `200 OK` so the gateway does not retry a payload we cannot use;
/// failures are logged with the raw body instead.
pub(super) async fn callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let payload = parse_gateway_payload(query.as_deref(), &headers, &body);

    match state
        .transitions
        .apply_signal(payload.clone(), SignalSource::Callback)
        .await
    {
        Ok(result) => {
            tracing::debug!(
                order_reference = %result.reservation.order_reference,
                status = %result.reservation.status,
                applied = result.applied,
                "Gateway callback processed"
            );
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                raw_body = %String::from_utf8_lossy(&body),
                %payload,
                "Failed to process gateway callback"
            );
        }
    }

    StatusCode::OK
}
