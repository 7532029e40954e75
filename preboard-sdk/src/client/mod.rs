//! HTTP clients for the reservation server APIs.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod admin;
mod onboarding;

pub use admin::AdminClient;
pub use onboarding::OnboardingClient;

use reqwest::StatusCode;

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

/// Like [`parse_response`], but accepts error statuses whose body still
/// decodes as `T`. The onboarding endpoints report rejections as
/// `{ "success": false, "error": ... }` with a 4xx/5xx status.
async fn parse_envelope<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ClientError::Api {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }),
        Err(e) => Err(ClientError::Json(e)),
    }
}
