use std::time::Duration;

/// Upper bounds for each saga step.
///
/// The transfer step includes the time the user spends in the wallet's
/// confirmation prompt, so it is much longer than the backend calls. It ends
/// when the transaction hash is known; waiting for confirmations is bounded
/// by [`TransferConfig::confirmation_timeout`](super::TransferConfig) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaTimeouts {
    pub payment: Duration,
    pub transfer: Duration,
    pub completion: Duration,
}

impl Default for SagaTimeouts {
    fn default() -> Self {
        Self {
            payment: Duration::from_secs(30),
            transfer: Duration::from_secs(300),
            completion: Duration::from_secs(30),
        }
    }
}
