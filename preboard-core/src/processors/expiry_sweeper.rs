//! ExpirySweeper processor.
//!
//! Periodically moves abandoned `pending`/`processing` reservations past their
//! expiry to `expired`. Paid rows are never touched; an expired-but-paid row
//! is rejected at claim time instead. The interval is read from a
//! [`ConfigStore`] so a reload can change or disable it.

use crate::config::{ConfigStore, ConfigWatcher};
use crate::store::{ReservationStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// `None` disables sweeping.
    pub interval: Option<Duration>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

pub struct ExpirySweeper {
    store: Arc<dyn ReservationStore>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Expire everything overdue at `now`. Returns the number of rows changed.
    pub async fn sweep_once(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let expired = self.store.expire_abandoned(now).await?;
        if expired > 0 {
            info!(expired, "Expired abandoned reservations");
        } else {
            debug!("No abandoned reservations to expire");
        }
        Ok(expired)
    }

    /// Run until shutdown is signaled.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        config_store: ConfigStore<SweeperConfig>,
        mut config_watcher: ConfigWatcher,
    ) {
        let mut interval = config_store.read().await.interval;
        info!(?interval, "ExpirySweeper started");

        loop {
            let tick = async {
                match interval {
                    Some(period) => tokio::time::sleep(period).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("ExpirySweeper received shutdown signal");
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    interval = config_store.read().await.interval;
                    info!(?interval, "ExpirySweeper reloaded interval");
                }

                _ = tick => {
                    if let Err(e) = self.sweep_once(OffsetDateTime::now_utc()).await {
                        error!(error = %e, "Expiry sweep failed");
                    }
                }
            }
        }

        info!("ExpirySweeper shutdown complete");
    }
}
