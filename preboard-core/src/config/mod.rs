//! Runtime configuration types.
//!
//! These are the validated values the services run with. Loading and parsing
//! the TOML file is the server crate's job.

mod admin;
mod checkout;
mod config_store;
mod frontend;
mod server;

pub use admin::AdminConfig;
pub use checkout::{
    CALLBACK_PATH, CheckoutConfig, DEFAULT_RESERVATION_TTL_DAYS, DEFAULT_SETTLEMENT_CURRENCY,
    DEFAULT_USER_TYPE, MAX_RESERVATION_TTL_DAYS, PRICE_CURRENCY, RETURN_PATH, default_price,
};
pub use config_store::{ConfigStore, ConfigWatcher};
pub use frontend::FrontendConfig;
pub use server::ServerConfig;

use crate::processors::{MailerConfig, SweeperConfig};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// Sections read by background processors are [`ConfigStore`]s so a SIGHUP
/// reload reaches them; the rest are plain locks.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub admin: Arc<RwLock<AdminConfig>>,
    pub frontend: ConfigStore<FrontendConfig>,
    pub checkout: ConfigStore<CheckoutConfig>,
    pub mailer: ConfigStore<MailerConfig>,
    pub sweeper: ConfigStore<SweeperConfig>,
}

impl SharedConfig {
    pub fn new(
        server: ServerConfig,
        admin: AdminConfig,
        frontend: FrontendConfig,
        checkout: CheckoutConfig,
        mailer: MailerConfig,
        sweeper: SweeperConfig,
    ) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            admin: Arc::new(RwLock::new(admin)),
            frontend: ConfigStore::new(frontend),
            checkout: ConfigStore::new(checkout),
            mailer: ConfigStore::new(mailer),
            sweeper: ConfigStore::new(sweeper),
        }
    }
}
