//! Runtime configuration re-exports.
//!
//! The validated config types live in `preboard-core`; this module re-exports
//! them alongside the processor settings that are reloaded with them.

pub use preboard_core::config::{
    AdminConfig, CheckoutConfig, FrontendConfig, ServerConfig, SharedConfig,
};
pub use preboard_core::processors::{MailerConfig, SweeperConfig};
