//! WebSocket message types for the wallet and saga progress streams.
//!
//! `GET /wallet/ws` pushes a [`WsServerMessage::Wallet`] frame with the
//! current snapshot right after the upgrade and again on every change.
//!
//! `GET /checkouts/{token}/ws` pushes [`WsServerMessage::Saga`] frames for
//! runs against that token and closes normally after a terminal stage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkout::{CheckoutToken, OrderId};
use super::finalize::FinalizeFailure;
use super::wallet::WalletSnapshot;

/// Server-to-client WebSocket message, tagged by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    Wallet { wallet: WalletSnapshot },
    Saga { progress: SagaProgress },
    Error { code: u16, reason: String },
}

/// One progress notification of a saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaProgress {
    pub run_id: Uuid,
    pub checkout_token: CheckoutToken,
    pub stage: SagaStage,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SagaStage {
    Started,
    PaymentAuthorized,
    TransferSubmitted { transaction_hash: String },
    Completed { order_id: OrderId },
    Failed { failure: FinalizeFailure },
}

impl SagaStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStage::Completed { .. } | SagaStage::Failed { .. })
    }
}

/// Close codes used by the streams (4000–4999 is the application range,
/// RFC 6455 §7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;
    pub const INTERNAL_ERROR: u16 = 1011;
    /// The wallet session manager has stopped.
    pub const WALLET_STOPPED: u16 = 4010;
}
