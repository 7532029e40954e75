//! Browser return from the hosted payment page.
//!
//! The handler applies the signal like the webhook does, re-reads the row and
//! then either redirects (top-level navigation) or renders a small page that
//! reports to the embedding frontend via `postMessage`.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use preboard_core::config::FrontendConfig;
use preboard_core::entities::PaymentStatus;
use preboard_core::services::{SignalSource, TransitionError, TransitionResult};
use preboard_sdk::objects::{PaymentMessage, PaymentMessageKind};
use url::Url;

use super::payload::parse_gateway_payload;
use crate::state::AppState;

const MISSING_REFERENCE_MESSAGE: &str = "Missing order reference";
const NOT_FOUND_MESSAGE: &str = "Payment not found";
const PROCESSING_ERROR_MESSAGE: &str = "There was a problem processing your payment";
const DECLINED_MESSAGE: &str = "Payment was declined or cancelled";
const EXPIRED_MESSAGE: &str = "Reservation has expired";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReturnOutcome {
    Success {
        order_reference: String,
        reservation_token: String,
    },
    Pending {
        order_reference: String,
    },
    Error {
        message: &'static str,
        order_reference: Option<String>,
    },
}

impl ReturnOutcome {
    fn from_result(result: &TransitionResult) -> Self {
        let row = &result.reservation;
        let order_reference = row.order_reference.clone();
        match row.status {
            PaymentStatus::Completed | PaymentStatus::Claimed => ReturnOutcome::Success {
                order_reference,
                reservation_token: row.reservation_token.clone(),
            },
            PaymentStatus::Pending | PaymentStatus::Processing => {
                ReturnOutcome::Pending { order_reference }
            }
            PaymentStatus::Failed => ReturnOutcome::Error {
                message: DECLINED_MESSAGE,
                order_reference: Some(order_reference),
            },
            PaymentStatus::Expired => ReturnOutcome::Error {
                message: EXPIRED_MESSAGE,
                order_reference: Some(order_reference),
            },
        }
    }

    fn message(&self) -> PaymentMessage {
        match self {
            ReturnOutcome::Success {
                order_reference,
                reservation_token,
            } => PaymentMessage {
                kind: PaymentMessageKind::PaymentSuccess,
                order_reference: Some(order_reference.clone()),
                reservation_token: Some(reservation_token.clone()),
                message: None,
            },
            ReturnOutcome::Pending { order_reference } => PaymentMessage {
                kind: PaymentMessageKind::PaymentPending,
                order_reference: Some(order_reference.clone()),
                reservation_token: None,
                message: None,
            },
            ReturnOutcome::Error {
                message,
                order_reference,
            } => PaymentMessage {
                kind: PaymentMessageKind::PaymentError,
                order_reference: order_reference.clone(),
                reservation_token: None,
                message: Some(message.to_string()),
            },
        }
    }

    fn target(&self, frontend: &FrontendConfig) -> Url {
        match self {
            ReturnOutcome::Success {
                order_reference,
                reservation_token,
            } => frontend.success_url(order_reference, Some(reservation_token)),
            ReturnOutcome::Pending { order_reference } => frontend.pending_url(order_reference),
            ReturnOutcome::Error {
                message,
                order_reference,
            } => frontend.failure_url(message, order_reference.as_deref()),
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            ReturnOutcome::Success { .. } => "Payment successful",
            ReturnOutcome::Pending { .. } => "Payment is being processed",
            ReturnOutcome::Error { .. } => "Payment could not be completed",
        }
    }
}

fn is_document_navigation(headers: &HeaderMap) -> bool {
    headers
        .get("sec-fetch-dest")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|dest| dest.eq_ignore_ascii_case("document"))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that is safe inside a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub(crate) fn render_page(outcome: &ReturnOutcome, frontend: &FrontendConfig) -> String {
    let target = outcome.target(frontend);
    let message = script_json(&outcome.message());
    let target_json = script_json(&target.as_str());
    let origin_json = script_json(&frontend.origin());
    let heading = outcome.heading();
    let href = escape_html(target.as_str());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{heading}</title>
</head>
<body>
<p>{heading}. Redirecting&hellip;</p>
<noscript><p><a href="{href}">Continue</a></p></noscript>
<script>
(function () {{
  var message = {message};
  var target = {target_json};
  if (window.parent && window.parent !== window) {{
    window.parent.postMessage(message, {origin_json});
  }} else {{
    window.location.replace(target);
  }}
}})();
</script>
</body>
</html>
"#
    )
}

/// `GET|POST /return`: browser return from the hosted payment page.
pub(super) async fn handle_return(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = parse_gateway_payload(query.as_deref(), &headers, &body);

    let (status, outcome) = match state
        .transitions
        .apply_signal(payload.clone(), SignalSource::Return)
        .await
    {
        Ok(result) => (StatusCode::OK, ReturnOutcome::from_result(&result)),
        Err(TransitionError::MissingOrderReference) => {
            tracing::warn!(%payload, "Browser return without order reference");
            (
                StatusCode::BAD_REQUEST,
                ReturnOutcome::Error {
                    message: MISSING_REFERENCE_MESSAGE,
                    order_reference: None,
                },
            )
        }
        Err(TransitionError::NotFound(order_reference)) => {
            tracing::warn!(%order_reference, "Browser return for unknown order");
            (
                StatusCode::NOT_FOUND,
                ReturnOutcome::Error {
                    message: NOT_FOUND_MESSAGE,
                    order_reference: Some(order_reference),
                },
            )
        }
        Err(e) => {
            tracing::error!(error = %e, %payload, "Failed to process browser return");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ReturnOutcome::Error {
                    message: PROCESSING_ERROR_MESSAGE,
                    order_reference: None,
                },
            )
        }
    };

    let frontend = state.config.frontend.snapshot().await;

    if status.is_success() && is_document_navigation(&headers) {
        return Redirect::to(outcome.target(&frontend).as_str()).into_response();
    }

    let mut response = (status, Html(render_page(&outcome, &frontend))).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
