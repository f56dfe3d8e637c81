//! Shared settings with change notification.
//!
//! The store keeps an `Arc<CheckoutSettings>` inside a watch channel.
//! Readers take the `Arc` and keep a consistent snapshot for as long as
//! they need it, while a reload swaps in a fresh value for later readers.

use super::CheckoutSettings;
use std::sync::Arc;
use tokio::sync::watch;

/// A shared, reloadable settings store.
#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Arc<CheckoutSettings>>>,
}

/// Receives the new settings whenever the [`SettingsStore`] is replaced.
pub struct SettingsWatcher {
    rx: watch::Receiver<Arc<CheckoutSettings>>,
}

impl SettingsStore {
    pub fn new(initial: CheckoutSettings) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// The settings currently in effect.
    pub fn current(&self) -> Arc<CheckoutSettings> {
        Arc::clone(&self.tx.borrow())
    }

    /// Replace the settings and notify all watchers.
    pub fn replace(&self, settings: CheckoutSettings) {
        self.tx.send_replace(Arc::new(settings));
    }

    pub fn subscribe(&self) -> SettingsWatcher {
        SettingsWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl SettingsWatcher {
    /// Wait for the next replacement and return the new settings.
    ///
    /// Returns an error once every [`SettingsStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<Arc<CheckoutSettings>, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(Arc::clone(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_settings;
    use wchk_sdk::objects::ChainId;

    #[tokio::test]
    async fn test_replace_notifies_watchers() {
        let store = SettingsStore::new(test_settings());
        let mut watcher = store.subscribe();
        let before = store.current();

        let mut next = test_settings();
        next.network.chain_id = ChainId(1);
        store.replace(next);

        let seen = watcher.changed().await.unwrap();
        assert_eq!(seen.network.chain_id, ChainId(1));
        assert_eq!(store.current().network.chain_id, ChainId(1));
        // Earlier snapshots are unaffected.
        assert_eq!(before.network.chain_id, ChainId(513100));
    }
}
