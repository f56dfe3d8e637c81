//! Application state shared across all request handlers.

use std::sync::Arc;
use wchk_core::backend::CheckoutBackend;
use wchk_core::config::SettingsStore;
use wchk_core::saga::FinalizationSaga;
use wchk_core::wallet::WalletHandle;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub saga: Arc<FinalizationSaga>,
    pub wallet: WalletHandle,
    pub backend: Arc<dyn CheckoutBackend>,
    /// Runtime settings (can be reloaded via SIGHUP).
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(
        saga: Arc<FinalizationSaga>,
        wallet: WalletHandle,
        backend: Arc<dyn CheckoutBackend>,
        settings: SettingsStore,
    ) -> Self {
        Self {
            saga,
            wallet,
            backend,
            settings,
        }
    }
}
