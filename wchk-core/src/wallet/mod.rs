//! Wallet session: the provider seam, the pure session state machine and
//! the actor that owns it.

mod machine;
mod manager;
mod provider;
mod rpc;

pub use machine::{SessionInput, SessionMachine};
pub use manager::{WalletCommand, WalletError, WalletHandle, WalletSessionManager};
pub use provider::{ProviderError, ProviderSubscription, TransactionRequest, WalletProvider};
pub use rpc::JsonRpcWalletProvider;
