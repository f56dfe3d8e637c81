use alloy_primitives::Address;
use std::time::Duration;

/// What is being transferred to the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The chain's native currency, sent as the transaction value.
    Native,
    /// An ERC-20 token, sent as a `transfer(address,uint256)` call on
    /// `contract` with zero value.
    Erc20 { contract: Address },
}

/// Parameters of the on-chain transfer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Merchant address receiving the funds.
    pub destination: Address,
    pub asset: AssetKind,
    /// Decimal exponent of the asset; display amounts are scaled by
    /// `10^decimals`.
    pub decimals: u32,
    /// Explicit gas limit. `None` leaves estimation to the wallet.
    pub gas_limit: Option<u64>,
    /// Confirmations to wait for after submission. `0` treats submission as
    /// success.
    pub required_confirmations: u64,
    /// Measured from submission, separately from the transfer step timeout.
    pub confirmation_timeout: Duration,
    pub confirmation_poll_interval: Duration,
}
