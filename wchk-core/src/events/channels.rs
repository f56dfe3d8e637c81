//! Event channel factories and handles.

use super::types::ProviderEvent;
use tokio::sync::{broadcast, mpsc};
use wchk_sdk::objects::SagaProgress;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Capacity of the saga progress broadcast. Slow WebSocket clients that fall
/// further behind than this observe `Lagged` and skip ahead.
pub const PROGRESS_BROADCAST_CAPACITY: usize = 64;

/// Sender handle for ProviderEvent events.
pub type ProviderEventSender = mpsc::Sender<ProviderEvent>;
/// Receiver handle for ProviderEvent events.
pub type ProviderEventReceiver = mpsc::Receiver<ProviderEvent>;

/// Sender handle for saga progress notifications.
pub type SagaProgressSender = broadcast::Sender<SagaProgress>;
/// Receiver handle for saga progress notifications.
pub type SagaProgressReceiver = broadcast::Receiver<SagaProgress>;

/// Create a new ProviderEvent channel.
///
/// Each provider subscription owns its own channel.
pub fn provider_event_channel() -> (ProviderEventSender, ProviderEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create the saga progress broadcast.
pub fn saga_progress_channel() -> (SagaProgressSender, SagaProgressReceiver) {
    broadcast::channel(PROGRESS_BROADCAST_CAPACITY)
}
