//! WalletSessionManager actor.
//!
//! The WalletSessionManager is responsible for:
//! - Owning the [`SessionMachine`], so there is exactly one writer
//! - Serving `connect` / `address` / `balance` commands from any number of
//!   [`WalletHandle`]s
//! - Feeding provider events (account and chain changes) into the machine
//! - Re-evaluating the network match when the required chain is reloaded
//! - Publishing every changed [`WalletSnapshot`] on a watch channel
//!
//! The provider subscription is acquired on the first successful connect,
//! re-acquired if it ends while the session is connected, and dropped (which
//! stops its watcher) when the manager stops.

use super::machine::{SessionInput, SessionMachine};
use super::provider::{ProviderError, ProviderSubscription, WalletProvider};
use crate::config::SettingsWatcher;
use crate::events::ProviderEvent;
use alloy_primitives::U256;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use wchk_sdk::objects::{ChainId, FailureKind, WalletSnapshot};

/// Buffer of the command channel between handles and the manager.
const COMMAND_BUFFER: usize = 32;

/// Errors returned to [`WalletHandle`] callers.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("no wallet available: {0}")]
    WalletUnavailable(String),

    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("wallet provider error: {0}")]
    Provider(ProviderError),

    /// The manager task is gone; no further commands can be served.
    #[error("wallet session manager has stopped")]
    ManagerStopped,
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(reason) => WalletError::WalletUnavailable(reason),
            ProviderError::UserRejected => WalletError::UserRejected,
            other => WalletError::Provider(other),
        }
    }
}

impl WalletError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WalletError::NotConnected => FailureKind::NotConnected,
            WalletError::WalletUnavailable(_) | WalletError::ManagerStopped => {
                FailureKind::WalletUnavailable
            }
            WalletError::UserRejected => FailureKind::UserRejected,
            WalletError::Provider(ProviderError::Request(_)) => FailureKind::Transport,
            WalletError::Provider(_) => FailureKind::ProviderError,
        }
    }
}

/// A request sent from a [`WalletHandle`] to the manager.
#[derive(Debug)]
pub enum WalletCommand {
    Connect {
        reply: oneshot::Sender<Result<WalletSnapshot, WalletError>>,
    },
    Address {
        reply: oneshot::Sender<Result<String, WalletError>>,
    },
    Balance {
        address: String,
        reply: oneshot::Sender<Result<U256, WalletError>>,
    },
}

/// Cloneable reader and command surface of the wallet session.
#[derive(Clone)]
pub struct WalletHandle {
    command_tx: mpsc::Sender<WalletCommand>,
    snapshot_rx: watch::Receiver<WalletSnapshot>,
}

impl WalletHandle {
    /// The session as of now. Callers that act on the session (such as the
    /// transfer step) keep this value instead of re-reading.
    pub fn snapshot(&self) -> WalletSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Observe every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<WalletSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Request account access. Returns the resulting snapshot, which may be
    /// `ConnectedWrongNetwork`.
    pub async fn connect(&self) -> Result<WalletSnapshot, WalletError> {
        self.request(|reply| WalletCommand::Connect { reply }).await
    }

    /// The currently exposed account. Fails with `NotConnected` unless the
    /// session is connected.
    pub async fn address(&self) -> Result<String, WalletError> {
        self.request(|reply| WalletCommand::Address { reply }).await
    }

    /// Native balance of `address` in base units.
    pub async fn balance(&self, address: &str) -> Result<U256, WalletError> {
        let address = address.to_string();
        self.request(|reply| WalletCommand::Balance { address, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, WalletError>>) -> WalletCommand,
    ) -> Result<T, WalletError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| WalletError::ManagerStopped)?;
        reply_rx.await.map_err(|_| WalletError::ManagerStopped)?
    }
}

/// The single owner of the wallet session.
pub struct WalletSessionManager {
    provider: Arc<dyn WalletProvider>,
    machine: SessionMachine,
    snapshot_tx: watch::Sender<WalletSnapshot>,
    command_rx: mpsc::Receiver<WalletCommand>,
    subscription: Option<ProviderSubscription>,
}

impl WalletSessionManager {
    /// Create a manager in the `Disconnected` state and a handle to it.
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        required_chain_id: ChainId,
    ) -> (Self, WalletHandle) {
        let machine = SessionMachine::new(required_chain_id);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let manager = Self {
            provider,
            machine,
            snapshot_tx,
            command_rx,
            subscription: None,
        };
        let handle = WalletHandle {
            command_tx,
            snapshot_rx,
        };
        (manager, handle)
    }

    /// Run until shutdown is signaled or every handle has been dropped.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut settings_watcher: SettingsWatcher,
    ) {
        info!("WalletSessionManager started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("WalletSessionManager received shutdown signal");
                        break;
                    }
                }

                event = next_provider_event(&mut self.subscription) => {
                    match event {
                        Some(event) => self.handle_provider_event(event).await,
                        None => {
                            warn!("Wallet provider subscription ended");
                            self.subscription = None;
                            if self.machine.state().is_connected() {
                                self.ensure_subscribed();
                            }
                        }
                    }
                }

                Ok(settings) = settings_watcher.changed() => {
                    let required = settings.network.chain_id;
                    if self.apply(SessionInput::RequiredChainChanged(required)) {
                        info!(required_chain_id = %required, "Required chain changed, network match re-evaluated");
                    }
                }

                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command).await;
                }

                else => {
                    info!("All wallet handles dropped");
                    break;
                }
            }
        }

        if self.subscription.take().is_some() {
            debug!("Released wallet provider subscription");
        }
        info!("WalletSessionManager shutdown complete");
    }

    async fn handle_command(&mut self, command: WalletCommand) {
        match command {
            WalletCommand::Connect { reply } => {
                let result = self.connect().await;
                let _ = reply.send(result);
            }
            WalletCommand::Address { reply } => {
                let result = self.address().await;
                let _ = reply.send(result);
            }
            WalletCommand::Balance { address, reply } => {
                let result = self.balance(address).await;
                let _ = reply.send(result);
            }
        }
    }

    async fn connect(&mut self) -> Result<WalletSnapshot, WalletError> {
        if self.machine.state().is_connected() {
            self.ensure_subscribed();
            return Ok(self.machine.snapshot());
        }

        self.apply(SessionInput::ConnectRequested);
        let identity = async {
            let accounts = self.provider.request_accounts().await?;
            let chain_id = self.provider.chain_id().await?;
            Ok::<_, ProviderError>((accounts, chain_id))
        }
        .await;

        match identity {
            Ok((accounts, _)) if accounts.is_empty() => {
                warn!("Wallet granted no accounts");
                self.apply(SessionInput::ConnectFailed);
                Err(WalletError::UserRejected)
            }
            Ok((accounts, chain_id)) => {
                self.apply(SessionInput::Connected { accounts, chain_id });
                self.ensure_subscribed();
                self.refresh_balance().await;
                let snapshot = self.machine.snapshot();
                info!(
                    state = ?snapshot.state,
                    address = snapshot.session.address.as_deref().unwrap_or_default(),
                    chain_id = %chain_id,
                    "Wallet connected"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Wallet connect failed");
                self.apply(SessionInput::ConnectFailed);
                Err(e.into())
            }
        }
    }

    async fn address(&mut self) -> Result<String, WalletError> {
        if !self.machine.state().is_connected() {
            return Err(WalletError::NotConnected);
        }
        let accounts = self.provider.accounts().await?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::NotConnected)?;
        self.apply(SessionInput::AddressResolved(address.clone()));
        Ok(address)
    }

    async fn balance(&mut self, address: String) -> Result<U256, WalletError> {
        if !self.machine.state().is_connected() {
            return Err(WalletError::NotConnected);
        }
        let balance = self.provider.balance(&address).await?;
        self.apply(SessionInput::BalanceResolved { address, balance });
        Ok(balance)
    }

    async fn handle_provider_event(&mut self, event: ProviderEvent) {
        debug!(event = ?event, "Received provider event");
        match event {
            ProviderEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                self.apply(SessionInput::AccountsChanged(accounts));
                info!("Wallet exposed no accounts, session disconnected");
            }
            ProviderEvent::AccountsChanged(accounts) => {
                self.apply(SessionInput::AccountsChanged(accounts.clone()));
                match self.provider.chain_id().await {
                    Ok(chain_id) => {
                        self.apply(SessionInput::Connected { accounts, chain_id });
                        self.refresh_balance().await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to re-evaluate wallet after account change");
                        self.apply(SessionInput::ConnectFailed);
                    }
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                self.apply(SessionInput::ChainChanged(chain_id));
            }
        }
    }

    fn ensure_subscribed(&mut self) {
        if self.subscription.is_none() {
            self.subscription = Some(self.provider.subscribe());
            debug!("Acquired wallet provider subscription");
        }
    }

    /// Best effort; a failed balance read leaves the cached value empty.
    async fn refresh_balance(&mut self) {
        let Some(address) = self.machine.session().address.clone() else {
            return;
        };
        match self.provider.balance(&address).await {
            Ok(balance) => {
                self.apply(SessionInput::BalanceResolved { address, balance });
            }
            Err(e) => warn!(error = %e, address = %address, "Failed to read wallet balance"),
        }
    }

    fn apply(&mut self, input: SessionInput) -> bool {
        let changed = self.machine.apply(input);
        if changed {
            let snapshot = self.machine.snapshot();
            debug!(state = ?snapshot.state, "Wallet session changed");
            self.snapshot_tx.send_replace(snapshot);
        }
        changed
    }
}

async fn next_provider_event(
    subscription: &mut Option<ProviderSubscription>,
) -> Option<ProviderEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
