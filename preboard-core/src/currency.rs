//! Converting the canonical USD price into the gateway settlement currency.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_RATE_ENDPOINT: &str = "https://open.er-api.com/v6/latest";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedAmount {
    /// Rounded to two decimal places.
    pub amount: Decimal,
    pub currency: String,
    pub rate: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum CurrencyError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rate service returned status {0}")]
    Http(u16),

    #[error("no rate available for {from}/{to}")]
    RateUnavailable { from: String, to: String },

    #[error("invalid rate response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<ConvertedAmount, CurrencyError>;
}

fn apply_rate(amount: Decimal, to: &str, rate: Decimal) -> ConvertedAmount {
    ConvertedAmount {
        amount: (amount * rate).round_dp(2),
        currency: to.to_string(),
        rate,
    }
}

fn identity(amount: Decimal, currency: &str) -> ConvertedAmount {
    apply_rate(amount, currency, Decimal::ONE)
}

// ---------------------------------------------------------------------------
// Fixed rates
// ---------------------------------------------------------------------------

/// Converter backed by configured rates, for pegged currencies such as AED.
#[derive(Debug, Clone, Default)]
pub struct FixedRateConverter {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_ascii_uppercase(), to.to_ascii_uppercase()), rate);
        self
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<ConvertedAmount, CurrencyError> {
        let (from, to) = (from.to_ascii_uppercase(), to.to_ascii_uppercase());
        if from == to {
            return Ok(identity(amount, &to));
        }
        let rate = self
            .rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or(CurrencyError::RateUnavailable { from, to: to.clone() })?;
        Ok(apply_rate(amount, &to, rate))
    }
}

// ---------------------------------------------------------------------------
// Live rates
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

/// Parse an `open.er-api.com` style `latest/{base}` response into a rate table.
pub fn parse_rates_response(body: &[u8]) -> Result<HashMap<String, Decimal>, CurrencyError> {
    let response: RatesResponse = serde_json::from_slice(body)
        .map_err(|e| CurrencyError::InvalidResponse(e.to_string()))?;
    if response.result != "success" {
        return Err(CurrencyError::InvalidResponse(
            response
                .error_type
                .unwrap_or_else(|| format!("result = {}", response.result)),
        ));
    }
    Ok(response.rates)
}

struct CachedRates {
    rates: HashMap<String, Decimal>,
    fetched_at: Instant,
}

/// Live converter with a per-base-currency TTL cache.
///
/// When a refresh fails the last good table is reused, so a flaky rate API
/// does not block checkout once a rate has been seen.
pub struct ExchangeRateApiConverter {
    http: reqwest::Client,
    endpoint: String,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedRates>>,
}

impl ExchangeRateApiConverter {
    pub fn new(endpoint: impl Into<String>, ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: endpoint.into(),
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, Decimal>, CurrencyError> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), base);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CurrencyError::Http(status.as_u16()));
        }
        let body = response.bytes().await?;
        parse_rates_response(&body)
    }

    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        let mut cache = self.cache.lock().await;

        let fresh = cache
            .get(from)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .and_then(|cached| cached.rates.get(to).copied());
        if let Some(rate) = fresh {
            return Ok(rate);
        }

        match self.fetch_rates(from).await {
            Ok(rates) => {
                debug!(base = from, count = rates.len(), "Fetched exchange rates");
                let rate = rates.get(to).copied();
                cache.insert(
                    from.to_string(),
                    CachedRates {
                        rates,
                        fetched_at: Instant::now(),
                    },
                );
                rate.ok_or_else(|| CurrencyError::RateUnavailable {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            Err(e) => {
                let stale = cache.get(from).and_then(|cached| cached.rates.get(to).copied());
                match stale {
                    Some(rate) => {
                        warn!(error = %e, base = from, quote = to, "Rate refresh failed, using last known rate");
                        Ok(rate)
                    }
                    None => Err(e),
                }
            }
        }
    }
}

#[async_trait]
impl CurrencyConverter for ExchangeRateApiConverter {
    #[tracing::instrument(skip(self), err)]
    async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<ConvertedAmount, CurrencyError> {
        let (from, to) = (from.to_ascii_uppercase(), to.to_ascii_uppercase());
        if from == to {
            return Ok(identity(amount, &to));
        }
        let rate = self.rate(&from, &to).await?;
        Ok(apply_rate(amount, &to, rate))
    }
}
