//! Event types and channels shared between the wallet session, its
//! provider watcher and the finalization saga.
//!
//! # Event Flow
//!
//! 1. Provider watcher emits `ProviderEvent` -> `WalletSessionManager`
//! 2. `WalletSessionManager` publishes `WalletSnapshot` on a watch channel
//! 3. `FinalizationSaga` broadcasts `SagaProgress` to every subscriber

pub mod channels;
pub mod types;

pub use channels::{
    provider_event_channel, saga_progress_channel, ProviderEventReceiver, ProviderEventSender,
    SagaProgressReceiver, SagaProgressSender, DEFAULT_CHANNEL_BUFFER, PROGRESS_BROADCAST_CAPACITY,
};
pub use types::ProviderEvent;
