//! Shared wire types for the pre-onboarding payment reservation service.
//!
//! The `objects` module is always available. Typed HTTP clients live in
//! `client` and are gated behind the `client` cargo feature.

#![forbid(unsafe_code)]

pub mod objects;

#[cfg(feature = "client")]
pub mod client;

/// Header carrying the plaintext admin secret on Admin API requests.
pub const ADMIN_AUTH_HEADER: &str = "Preboard-Admin-Authorization";
