#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod currency;
pub mod entities;
pub mod events;
pub mod framework;
pub mod gateway;
pub mod notifier;
pub mod processors;
pub mod services;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
