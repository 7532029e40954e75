//! Hot-reloadable config sections.
//!
//! `ConfigStore<T>` keeps one section behind a lock and bumps a version on
//! every SIGHUP reload; background processors hold a [`ConfigWatcher`] and
//! pick up the new value without polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, watch};

pub struct ConfigStore<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    data: RwLock<T>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

/// Change notifications for one [`ConfigStore`].
pub struct ConfigWatcher {
    version_rx: watch::Receiver<u64>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(initial),
                version: AtomicU64::new(0),
                version_tx,
            }),
        }
    }

    /// Replace the section and wake every watcher.
    pub async fn update(&self, value: T) {
        let mut guard = self.inner.data.write().await;
        *guard = value;
        let version = self.inner.version.fetch_add(1, Ordering::Relaxed) + 1;
        // Release the write lock first so woken watchers can read right away.
        drop(guard);
        let _ = self.inner.version_tx.send(version);
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.data.read().await
    }

    pub fn subscribe(&self) -> ConfigWatcher {
        ConfigWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone the current value so no lock is held across awaits.
    pub async fn snapshot(&self) -> T {
        self.inner.data.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConfigWatcher {
    /// Wait for the next update. Errors once the store has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.version_rx.changed().await
    }
}
