//! TOML file configuration structures.
//!
//! These structs directly map to the `preboard-config.toml` file format.

use preboard_core::config::{
    DEFAULT_RESERVATION_TTL_DAYS, DEFAULT_SETTLEMENT_CURRENCY, DEFAULT_USER_TYPE, default_price,
};
use preboard_core::currency::DEFAULT_RATE_ENDPOINT;
use preboard_core::gateway::DEFAULT_TELR_ENDPOINT;
use preboard_core::notifier::DEFAULT_EMAIL_API_URL;
use preboard_core::processors::confirmation_mailer::DEFAULT_CONFIRMATION_SUBJECT;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    pub frontend: FrontendConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub exchange_rate: ExchangeRateConfig,
    /// Absent means emails are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Base URL the gateway and browsers use to reach this server.
    pub public_base_url: Url,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_price")]
    pub price_usd: Decimal,
    #[serde(default = "default_settlement_currency")]
    pub settlement_currency: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_ttl_days")]
    pub reservation_ttl_days: i64,
    #[serde(default = "default_user_type")]
    pub default_user_type: String,
    /// Product variants applicants may request. Must include `default_user_type`.
    #[serde(default = "default_user_types")]
    pub user_types: Vec<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            price_usd: default_price(),
            settlement_currency: default_settlement_currency(),
            description: default_description(),
            reservation_ttl_days: default_ttl_days(),
            default_user_type: default_user_type(),
            user_types: default_user_types(),
        }
    }
}

fn default_settlement_currency() -> String {
    DEFAULT_SETTLEMENT_CURRENCY.to_string()
}

fn default_description() -> String {
    "Pre-onboarding reservation".to_string()
}

fn default_ttl_days() -> i64 {
    DEFAULT_RESERVATION_TTL_DAYS
}

fn default_user_type() -> String {
    DEFAULT_USER_TYPE.to_string()
}

fn default_user_types() -> Vec<String> {
    vec![default_user_type()]
}

/// Onboarding frontend routes. Paths fall back to the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub base_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_path: Option<String>,
}

/// Payment gateway credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub store_id: String,
    pub auth_key: String,
    #[serde(default = "default_gateway_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub test_mode: bool,
}

fn default_gateway_endpoint() -> String {
    DEFAULT_TELR_ENDPOINT.to_string()
}

/// A configured rate, e.g. the AED peg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRate {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

/// Currency conversion. Fixed rates, when given, replace the live rate API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateConfig {
    #[serde(default = "default_rate_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_rates: Vec<FixedRate>,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rate_endpoint(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fixed_rates: Vec::new(),
        }
    }
}

fn default_rate_endpoint() -> String {
    DEFAULT_RATE_ENDPOINT.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

fn default_email_api_url() -> String {
    DEFAULT_EMAIL_API_URL.to_string()
}

fn default_subject() -> String {
    DEFAULT_CONFIRMATION_SUBJECT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between expiry sweeps; `0` disables the sweeper.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    preboard_core::processors::expiry_sweeper::DEFAULT_SWEEP_INTERVAL.as_secs()
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
listen = "127.0.0.1:3000"
public_base_url = "https://api.example.com"

[admin]
secret = "test-secret"

[frontend]
base_url = "https://app.example.com"

[gateway]
store_id = "12345"
auth_key = "gateway-key"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: FileConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.checkout.price_usd, Decimal::new(9900, 2));
        assert_eq!(config.checkout.settlement_currency, "AED");
        assert_eq!(config.checkout.reservation_ttl_days, 30);
        assert_eq!(config.checkout.user_types, vec!["individual".to_string()]);
        assert_eq!(config.gateway.endpoint, DEFAULT_TELR_ENDPOINT);
        assert!(!config.gateway.test_mode);
        assert!(config.exchange_rate.fixed_rates.is_empty());
        assert!(config.email.is_none());
        assert_eq!(config.sweeper.interval_secs, 900);
        assert!(!config.is_admin_secret_hashed());
    }

    #[test]
    fn test_full_config_parsing() {
        let toml_str = format!(
            "{MINIMAL}\n{}",
            r#"
[checkout]
price_usd = "149.00"
settlement_currency = "usd"
reservation_ttl_days = 14
user_types = ["individual", "team"]

[[exchange_rate.fixed_rates]]
from = "USD"
to = "AED"
rate = "3.6725"

[email]
api_key = "mail-key"
from_address = "noreply@example.com"
template_id = "d-123"

[sweeper]
interval_secs = 0
"#
        );
        let config: FileConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.checkout.price_usd, Decimal::new(14900, 2));
        assert_eq!(config.checkout.default_user_type, "individual");
        assert_eq!(config.checkout.user_types, ["individual", "team"]);
        assert_eq!(config.exchange_rate.fixed_rates.len(), 1);
        let email = config.email.unwrap();
        assert_eq!(email.api_url, DEFAULT_EMAIL_API_URL);
        assert_eq!(email.template_id.as_deref(), Some("d-123"));
        assert_eq!(config.sweeper.interval_secs, 0);
    }

    #[test]
    fn test_hashed_secret_detection() {
        let mut config: FileConfig = toml::from_str(MINIMAL).unwrap();
        config.admin.secret = "$argon2id$v=19$m=19456,t=2,p=1$abc123".to_string();
        assert!(config.is_admin_secret_hashed());
    }
}
