//! Checkout pricing and gateway routing.

use rust_decimal::Decimal;
use url::Url;

pub const RETURN_PATH: &str = "/api/v1/payment/pre-onboarding/return";
pub const CALLBACK_PATH: &str = "/api/v1/payment/pre-onboarding/callback";

pub const PRICE_CURRENCY: &str = "USD";
pub const DEFAULT_SETTLEMENT_CURRENCY: &str = "AED";
pub const DEFAULT_USER_TYPE: &str = "individual";
pub const DEFAULT_RESERVATION_TTL_DAYS: i64 = 30;
/// Upper bound on the configured reservation lifetime.
pub const MAX_RESERVATION_TTL_DAYS: i64 = 3650;

pub fn default_price() -> Decimal {
    Decimal::new(9900, 2)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Canonical charge in [`PRICE_CURRENCY`].
    pub price: Decimal,
    /// Currency the gateway settles in.
    pub settlement_currency: String,
    pub description: String,
    pub reservation_ttl: time::Duration,
    pub default_user_type: String,
    /// Product variants an applicant may ask for.
    pub user_types: Vec<String>,
    /// Browser return endpoint for authorised, declined and cancelled payments.
    pub return_url: Url,
    /// Server-to-server webhook endpoint.
    pub callback_url: Url,
}

impl CheckoutConfig {
    /// Defaults with return and callback URLs derived from the public base URL.
    pub fn with_public_base_url(public_base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            price: default_price(),
            settlement_currency: DEFAULT_SETTLEMENT_CURRENCY.to_string(),
            description: "Pre-onboarding reservation".to_string(),
            reservation_ttl: time::Duration::days(DEFAULT_RESERVATION_TTL_DAYS),
            default_user_type: DEFAULT_USER_TYPE.to_string(),
            user_types: vec![DEFAULT_USER_TYPE.to_string()],
            return_url: public_base_url.join(RETURN_PATH)?,
            callback_url: public_base_url.join(CALLBACK_PATH)?,
        })
    }

    pub fn offers_user_type(&self, user_type: &str) -> bool {
        self.user_types.iter().any(|offered| offered == user_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls_ignore_base_path() {
        let base = Url::parse("https://api.example.com/some/prefix/").unwrap();
        let config = CheckoutConfig::with_public_base_url(&base).unwrap();
        assert_eq!(
            config.return_url.as_str(),
            "https://api.example.com/api/v1/payment/pre-onboarding/return"
        );
        assert_eq!(
            config.callback_url.as_str(),
            "https://api.example.com/api/v1/payment/pre-onboarding/callback"
        );
        assert_eq!(config.price.to_string(), "99.00");
    }

    #[test]
    fn test_default_variant_is_offered() {
        let base = Url::parse("https://api.example.com").unwrap();
        let config = CheckoutConfig::with_public_base_url(&base).unwrap();
        assert!(config.offers_user_type(&config.default_user_type));
        assert!(!config.offers_user_type("superadmin"));
        assert!(!config.offers_user_type("Individual"));
    }
}
