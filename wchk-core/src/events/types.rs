//! Event type definitions.

use wchk_sdk::objects::ChainId;

/// A change reported by the wallet provider outside of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed. Empty means the user locked or
    /// disconnected the wallet.
    AccountsChanged(Vec<String>),
    /// The wallet switched to another network.
    ChainChanged(ChainId),
}
