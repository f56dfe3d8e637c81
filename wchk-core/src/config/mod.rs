//! Runtime configuration for the wallet session and the finalization saga.
//!
//! These types are the validated form of the configuration file. Loading and
//! parsing is handled by the server crate. Everything inside
//! [`CheckoutSettings`] may be swapped at runtime through a
//! [`SettingsStore`]; each saga run reads one consistent snapshot.

mod backend;
mod gateway;
mod network;
mod settings_store;
mod timeouts;
mod transfer;

pub use backend::BackendConfig;
pub use gateway::GatewayConfig;
pub use network::NetworkConfig;
pub use settings_store::{SettingsStore, SettingsWatcher};
pub use timeouts::SagaTimeouts;
pub use transfer::{AssetKind, TransferConfig};

/// Reloadable settings consumed by the wallet session and the saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub network: NetworkConfig,
    pub transfer: TransferConfig,
    pub gateway: GatewayConfig,
    pub timeouts: SagaTimeouts,
}
