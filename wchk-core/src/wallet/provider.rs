//! The seam between the session and whatever wallet actually holds the
//! user's keys.

use crate::events::{ProviderEvent, ProviderEventReceiver};
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use wchk_sdk::objects::ChainId;

/// Errors reported by a wallet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No wallet is reachable, or it is disconnected from every chain.
    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),

    /// The user dismissed the wallet prompt.
    #[error("user rejected the request")]
    UserRejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The transaction was mined but execution failed.
    #[error("transaction {0} reverted")]
    Reverted(B256),

    /// Any other JSON-RPC error object.
    #[error("provider returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Parse(String),
}

/// A value transfer or contract call to be signed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Option<Bytes>,
    pub gas_limit: Option<u64>,
}

/// A live stream of [`ProviderEvent`]s.
///
/// Dropping the subscription stops the background watcher feeding it.
pub struct ProviderSubscription {
    events: ProviderEventReceiver,
    watcher: Option<JoinHandle<()>>,
}

impl ProviderSubscription {
    pub fn new(events: ProviderEventReceiver, watcher: Option<JoinHandle<()>>) -> Self {
        Self { events, watcher }
    }

    /// Receive the next event. `None` once the provider side has gone away.
    pub async fn recv(&mut self) -> Option<ProviderEvent> {
        self.events.recv().await
    }
}

impl Drop for ProviderSubscription {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Trait for wallet provider implementations.
///
/// Mirrors the EIP-1193 request surface the session needs. Implementations
/// must be safe to share between the session manager and the transfer step.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to expose their accounts. May open a wallet prompt.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Accounts already exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;

    async fn chain_id(&self) -> Result<ChainId, ProviderError>;

    /// Native balance of `address` in base units.
    async fn balance(&self, address: &str) -> Result<U256, ProviderError>;

    /// Sign `request` with the wallet and broadcast it. Returns the
    /// transaction hash once the wallet has submitted it.
    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError>;

    /// Confirmation depth of a submitted transaction. `None` while pending.
    async fn confirmations(&self, tx_hash: B256) -> Result<Option<u64>, ProviderError>;

    /// Start receiving account and network change notifications.
    fn subscribe(&self) -> ProviderSubscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::provider_event_channel;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_dropping_subscription_stops_watcher() {
        let (_event_tx, event_rx) = provider_event_channel();
        let (alive_tx, mut alive_rx) = mpsc::channel::<()>(1);
        let watcher = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        });

        let subscription = ProviderSubscription::new(event_rx, Some(watcher));
        drop(subscription);

        let closed = tokio::time::timeout(Duration::from_secs(1), alive_rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
    }
}
