//! Configuration module for preboard-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::{EmailConfig, ExchangeRateConfig, FileConfig};
use crate::config::runtime::{
    AdminConfig, CheckoutConfig, FrontendConfig, MailerConfig, ServerConfig, SharedConfig,
    SweeperConfig,
};
use preboard_core::config::MAX_RESERVATION_TTL_DAYS;
use preboard_core::currency::{CurrencyConverter, ExchangeRateApiConverter, FixedRateConverter};
use preboard_core::gateway::{PaymentGateway, TelrConfig, TelrGateway};
use preboard_core::notifier::{EmailNotifier, HttpEmailNotifier, LogEmailNotifier};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub frontend: FrontendConfig,
    pub checkout: CheckoutConfig,
    pub mailer: MailerConfig,
    pub sweeper: SweeperConfig,
    pub gateway: TelrConfig,
    pub exchange_rate: ExchangeRateConfig,
    pub email: Option<EmailConfig>,
}

impl LoadedConfig {
    /// Split off the sections that live in [`SharedConfig`].
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(
            self.server,
            self.admin,
            self.frontend,
            self.checkout,
            self.mailer,
            self.sweeper,
        )
    }

    pub fn payment_gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::new(TelrGateway::new(self.gateway.clone()))
    }

    pub fn currency_converter(&self) -> Arc<dyn CurrencyConverter> {
        let rates = &self.exchange_rate;
        if rates.fixed_rates.is_empty() {
            tracing::info!(endpoint = %rates.endpoint, "Using live exchange rates");
            return Arc::new(ExchangeRateApiConverter::new(
                rates.endpoint.clone(),
                Duration::from_secs(rates.cache_ttl_secs),
            ));
        }
        tracing::info!(count = rates.fixed_rates.len(), "Using fixed exchange rates");
        let converter = rates
            .fixed_rates
            .iter()
            .fold(FixedRateConverter::new(), |converter, fixed| {
                converter.with_rate(&fixed.from, &fixed.to, fixed.rate)
            });
        Arc::new(converter)
    }

    pub fn email_notifier(&self) -> Arc<dyn EmailNotifier> {
        match &self.email {
            Some(email) => Arc::new(HttpEmailNotifier::new(
                email.api_url.clone(),
                email.api_key.clone(),
                email.from_address.clone(),
            )),
            None => {
                tracing::warn!("No [email] section configured, confirmation emails will only be logged");
                Arc::new(LogEmailNotifier)
            }
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        build_loaded_config(file_config, secret_hash)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write to a sibling file, then rename over the original.
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.admin.secret.trim().is_empty() {
        return invalid("admin.secret must not be empty".to_string());
    }
    if config.checkout.price_usd <= rust_decimal::Decimal::ZERO {
        return invalid("checkout.price_usd must be positive".to_string());
    }
    let currency = &config.checkout.settlement_currency;
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return invalid(format!(
            "checkout.settlement_currency {currency:?} is not a 3-letter code"
        ));
    }
    let ttl_days = config.checkout.reservation_ttl_days;
    if !(1..=MAX_RESERVATION_TTL_DAYS).contains(&ttl_days) {
        return invalid(format!(
            "checkout.reservation_ttl_days must be between 1 and {MAX_RESERVATION_TTL_DAYS}"
        ));
    }
    let user_types = &config.checkout.user_types;
    if user_types.iter().any(|t| t.trim().is_empty() || t.trim() != t) {
        return invalid("checkout.user_types entries must be non-blank and trimmed".to_string());
    }
    if !user_types.contains(&config.checkout.default_user_type) {
        return invalid(format!(
            "checkout.default_user_type {:?} is not listed in checkout.user_types",
            config.checkout.default_user_type
        ));
    }
    if config.gateway.store_id.trim().is_empty() || config.gateway.auth_key.trim().is_empty() {
        return invalid("gateway.store_id and gateway.auth_key are required".to_string());
    }
    for path in [
        &config.frontend.success_path,
        &config.frontend.failure_path,
        &config.frontend.pending_path,
        &config.frontend.onboarding_path,
    ]
    .into_iter()
    .flatten()
    {
        if !path.starts_with('/') {
            return invalid(format!("frontend path {path:?} must start with '/'"));
        }
    }
    for fixed in &config.exchange_rate.fixed_rates {
        if fixed.rate <= rust_decimal::Decimal::ZERO {
            return invalid(format!("fixed rate {}/{} must be positive", fixed.from, fixed.to));
        }
    }
    Ok(())
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(
    file_config: FileConfig,
    secret_hash: String,
) -> Result<LoadedConfig, ConfigError> {
    let server = file_config.server;
    let invalid_url = |what: &str, e: url::ParseError| {
        ConfigError::ValidationError(format!("invalid {what}: {e}"))
    };

    let mut checkout = CheckoutConfig::with_public_base_url(&server.public_base_url)
        .map_err(|e| invalid_url("server.public_base_url", e))?;
    checkout.price = file_config.checkout.price_usd;
    checkout.settlement_currency = file_config.checkout.settlement_currency.to_ascii_uppercase();
    checkout.description = file_config.checkout.description;
    checkout.reservation_ttl = time::Duration::days(file_config.checkout.reservation_ttl_days);
    checkout.default_user_type = file_config.checkout.default_user_type;
    checkout.user_types = file_config.checkout.user_types;

    let file_frontend = file_config.frontend;
    let mut frontend = FrontendConfig::new(file_frontend.base_url);
    if let Some(path) = file_frontend.success_path {
        frontend.success_path = path;
    }
    if let Some(path) = file_frontend.failure_path {
        frontend.failure_path = path;
    }
    if let Some(path) = file_frontend.pending_path {
        frontend.pending_path = path;
    }
    if let Some(path) = file_frontend.onboarding_path {
        frontend.onboarding_path = path;
    }

    let mailer = match &file_config.email {
        Some(email) => MailerConfig {
            subject: email.subject.clone(),
            template_id: email.template_id.clone(),
        },
        None => MailerConfig::default(),
    };

    let sweeper = SweeperConfig {
        interval: (file_config.sweeper.interval_secs > 0)
            .then(|| Duration::from_secs(file_config.sweeper.interval_secs)),
    };

    let gateway = TelrConfig {
        store_id: file_config.gateway.store_id,
        auth_key: file_config.gateway.auth_key,
        endpoint: Url::parse(&file_config.gateway.endpoint)
            .map_err(|e| invalid_url("gateway.endpoint", e))?,
        test_mode: file_config.gateway.test_mode,
    };

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: server.listen,
            public_base_url: server.public_base_url,
        },
        admin: AdminConfig::new(secret_hash),
        frontend,
        checkout,
        mailer,
        sweeper,
        gateway,
        exchange_rate: file_config.exchange_rate,
        email: file_config.email,
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
