//! Wallet session objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric chain identifier (EIP-155).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chain id: {0:?}")]
pub struct ChainIdParseError(pub String);

impl FromStr for ChainId {
    type Err = ChainIdParseError;

    /// Accepts both the `0x`-prefixed quantity wallets return from
    /// `eth_chainId` and a plain decimal string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|_| ChainIdParseError(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse connection state of the wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletState {
    Disconnected,
    Connecting,
    ConnectedWrongNetwork,
    ConnectedReady,
}

impl WalletState {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            WalletState::ConnectedWrongNetwork | WalletState::ConnectedReady
        )
    }
}

/// Connectivity and identity of the user's wallet.
///
/// `address` and `balance` are only ever present while `connected` is true.
/// `balance` is the native balance in base units, as a decimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub connected: bool,
    pub network_matched: bool,
    pub address: Option<String>,
    pub balance: Option<String>,
}

/// A consistent point-in-time view published by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub state: WalletState,
    pub session: WalletSession,
    /// Last chain the wallet reported, if any.
    pub chain_id: Option<ChainId>,
    pub required_chain_id: ChainId,
}

impl WalletSnapshot {
    pub fn disconnected(required_chain_id: ChainId) -> Self {
        Self {
            state: WalletState::Disconnected,
            session: WalletSession::default(),
            chain_id: None,
            required_chain_id,
        }
    }
}
