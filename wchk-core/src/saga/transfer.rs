//! OnChainTransferExecutor: builds the merchant transfer, has the wallet
//! sign and broadcast it, and optionally waits for it to be mined.

use crate::config::{AssetKind, TransferConfig};
use crate::utils::base_units::{UnitsError, to_base_units};
use crate::wallet::{ProviderError, TransactionRequest, WalletProvider};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use wchk_sdk::objects::{ChainId, TransferReceipt, WalletSnapshot, WalletState};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

/// Errors that can occur submitting the transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("wallet is on chain {actual:?}, expected {expected}")]
    WrongNetwork {
        expected: ChainId,
        actual: Option<ChainId>,
    },

    #[error("invalid transfer amount: {0}")]
    InvalidAmount(#[from] UnitsError),

    /// The session address is not a valid EVM address.
    #[error("invalid signer address {0:?}")]
    InvalidSigner(String),

    #[error("no wallet available: {0}")]
    WalletUnavailable(String),

    #[error("user rejected the transaction")]
    UserRejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("transaction {hash} not confirmed within {waited:?}")]
    ConfirmationTimeout { hash: B256, waited: Duration },

    #[error("wallet provider error: {0}")]
    Provider(ProviderError),
}

impl From<ProviderError> for TransferError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(reason) => TransferError::WalletUnavailable(reason),
            ProviderError::UserRejected => TransferError::UserRejected,
            ProviderError::InsufficientFunds(reason) => TransferError::InsufficientFunds(reason),
            ProviderError::Reverted(hash) => TransferError::Reverted(hash),
            other => TransferError::Provider(other),
        }
    }
}

#[derive(Debug, Clone)]
/// Transfer `amount` (display units) from the wallet in `session`.
pub struct SubmitTransfer {
    /// Captured once by the caller; the signer identity is never re-read
    /// during the step.
    pub session: WalletSnapshot,
    pub amount: Decimal,
    pub transfer: TransferConfig,
}

/// A broadcast transfer, not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub hash: B256,
}

impl SubmittedTransfer {
    pub fn receipt(&self) -> TransferReceipt {
        TransferReceipt {
            submitted: true,
            transaction_hash: Some(self.hash.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
/// Wait until `hash` has `transfer.required_confirmations` blocks on top,
/// bounded by `transfer.confirmation_timeout`.
pub struct ConfirmTransfer {
    pub hash: B256,
    pub transfer: TransferConfig,
}

pub struct OnChainTransferExecutor {
    provider: Arc<dyn WalletProvider>,
}

impl OnChainTransferExecutor {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self { provider }
    }

    /// Build the transaction for a transfer of `amount` base units.
    pub fn build_request(from: Address, amount: U256, config: &TransferConfig) -> TransactionRequest {
        match config.asset {
            AssetKind::Native => TransactionRequest {
                from,
                to: config.destination,
                value: amount,
                data: None,
                gas_limit: config.gas_limit,
            },
            AssetKind::Erc20 { contract } => {
                let call = transferCall {
                    to: config.destination,
                    amount,
                };
                TransactionRequest {
                    from,
                    to: contract,
                    value: U256::ZERO,
                    data: Some(Bytes::from(call.abi_encode())),
                    gas_limit: config.gas_limit,
                }
            }
        }
    }

    fn signer(session: &WalletSnapshot) -> Result<Address, TransferError> {
        match session.state {
            WalletState::ConnectedReady => {}
            WalletState::ConnectedWrongNetwork => {
                return Err(TransferError::WrongNetwork {
                    expected: session.required_chain_id,
                    actual: session.chain_id,
                });
            }
            WalletState::Disconnected | WalletState::Connecting => {
                return Err(TransferError::NotConnected);
            }
        }
        let address = session
            .session
            .address
            .as_deref()
            .ok_or(TransferError::NotConnected)?;
        address
            .parse::<Address>()
            .map_err(|_| TransferError::InvalidSigner(address.to_string()))
    }

    async fn await_confirmations(
        &self,
        hash: B256,
        config: &TransferConfig,
    ) -> Result<(), TransferError> {
        let required = config.required_confirmations;
        let wait = async {
            loop {
                match self.provider.confirmations(hash).await {
                    Ok(Some(depth)) if depth >= required => return Ok(()),
                    Ok(depth) => debug!(tx_hash = %hash, ?depth, required, "Waiting for confirmations"),
                    Err(ProviderError::Reverted(hash)) => return Err(TransferError::Reverted(hash)),
                    Err(e) => warn!(tx_hash = %hash, error = %e, "Confirmation poll failed"),
                }
                tokio::time::sleep(config.confirmation_poll_interval).await;
            }
        };

        tokio::time::timeout(config.confirmation_timeout, wait)
            .await
            .map_err(|_| TransferError::ConfirmationTimeout {
                hash,
                waited: config.confirmation_timeout,
            })?
    }
}

impl Processor<SubmitTransfer> for OnChainTransferExecutor {
    type Output = SubmittedTransfer;
    type Error = TransferError;

    async fn process(&self, input: SubmitTransfer) -> Result<SubmittedTransfer, TransferError> {
        let from = Self::signer(&input.session)?;
        let amount = to_base_units(input.amount, input.transfer.decimals)?;
        let request = Self::build_request(from, amount, &input.transfer);

        info!(
            from = %from,
            to = %request.to,
            amount = %input.amount,
            base_units = %amount,
            "Submitting transfer for signature"
        );
        let hash = self.provider.sign_and_send(request).await?;
        info!(tx_hash = %hash, "Transfer submitted");
        Ok(SubmittedTransfer { hash })
    }
}

impl Processor<ConfirmTransfer> for OnChainTransferExecutor {
    type Output = ();
    type Error = TransferError;

    async fn process(&self, input: ConfirmTransfer) -> Result<(), TransferError> {
        let required = input.transfer.required_confirmations;
        if required == 0 {
            return Ok(());
        }
        self.await_confirmations(input.hash, &input.transfer).await?;
        info!(tx_hash = %input.hash, confirmations = required, "Transfer confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ALICE, FakeWalletProvider, REQUIRED_CHAIN, SendBehavior, test_settings};
    use alloy_primitives::{address, hex};
    use std::str::FromStr;
    use wchk_sdk::objects::WalletSession;

    fn ready_session() -> WalletSnapshot {
        WalletSnapshot {
            state: WalletState::ConnectedReady,
            session: WalletSession {
                connected: true,
                network_matched: true,
                address: Some(ALICE.to_string()),
                balance: None,
            },
            chain_id: Some(REQUIRED_CHAIN),
            required_chain_id: REQUIRED_CHAIN,
        }
    }

    fn submit(session: WalletSnapshot, amount: &str, transfer: TransferConfig) -> SubmitTransfer {
        SubmitTransfer {
            session,
            amount: Decimal::from_str(amount).unwrap(),
            transfer,
        }
    }

    #[test]
    fn test_erc20_transfer_calldata() {
        let config = test_settings().transfer;
        let from = address!("0x1111111111111111111111111111111111111111");
        let request = OnChainTransferExecutor::build_request(from, U256::from(1u64), &config);

        assert_eq!(config.asset, AssetKind::Erc20 { contract: request.to });
        assert_eq!(request.value, U256::ZERO);
        assert_eq!(request.gas_limit, Some(2_100_000));

        let data = request.data.unwrap();
        // transfer(address,uint256)
        assert_eq!(&data[..4], &hex!("a9059cbb"));
        assert_eq!(&data[16..36], config.destination.as_slice());
        assert_eq!(data[67], 1);
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn test_native_transfer_sends_value() {
        let mut config = test_settings().transfer;
        config.asset = AssetKind::Native;
        config.gas_limit = None;
        let from = address!("0x1111111111111111111111111111111111111111");
        let request = OnChainTransferExecutor::build_request(from, U256::from(5u64), &config);

        assert_eq!(request.to, config.destination);
        assert_eq!(request.value, U256::from(5u64));
        assert!(request.data.is_none());
    }

    #[tokio::test]
    async fn test_submits_scaled_amount() {
        let provider = FakeWalletProvider::new(vec![ALICE], REQUIRED_CHAIN);
        let executor = OnChainTransferExecutor::new(provider.clone());

        let submitted = executor
            .process(submit(ready_session(), "100.00", test_settings().transfer))
            .await
            .unwrap();
        assert_eq!(submitted.hash, crate::testing::H1);
        let receipt = submitted.receipt();
        assert!(receipt.submitted);
        assert_eq!(
            receipt.transaction_hash.as_deref(),
            Some(crate::testing::H1.to_string().as_str())
        );

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        let call = transferCall::abi_decode(sent[0].data.as_ref().unwrap()).unwrap();
        assert_eq!(call.amount, U256::from(100_000_000_000_000_000_000u128));
    }

    #[tokio::test]
    async fn test_preconditions_are_checked_before_signing() {
        let provider = FakeWalletProvider::new(vec![ALICE], REQUIRED_CHAIN);
        let executor = OnChainTransferExecutor::new(provider.clone());

        let mut wrong = ready_session();
        wrong.state = WalletState::ConnectedWrongNetwork;
        wrong.session.network_matched = false;
        wrong.chain_id = Some(ChainId(1));
        let err = executor
            .process(submit(wrong, "1", test_settings().transfer))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::WrongNetwork {
                actual: Some(ChainId(1)),
                ..
            }
        ));

        let disconnected = WalletSnapshot::disconnected(REQUIRED_CHAIN);
        let err = executor
            .process(submit(disconnected, "1", test_settings().transfer))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotConnected));

        let err = executor
            .process(submit(ready_session(), "0.0000000000000000001", test_settings().transfer))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidAmount(_)));

        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_signature() {
        let provider = FakeWalletProvider::new(vec![ALICE], REQUIRED_CHAIN);
        provider.update(|s| s.send = SendBehavior::Reject);
        let executor = OnChainTransferExecutor::new(provider);

        let err = executor
            .process(submit(ready_session(), "1", test_settings().transfer))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::UserRejected));
    }

    #[tokio::test]
    async fn test_waits_for_required_confirmations() {
        let provider = FakeWalletProvider::new(vec![ALICE], REQUIRED_CHAIN);
        provider.update(|s| s.confirmations = Some(3));
        let executor = OnChainTransferExecutor::new(provider.clone());

        let mut config = test_settings().transfer;
        config.required_confirmations = 2;
        config.confirmation_poll_interval = Duration::from_millis(5);
        let submitted = executor
            .process(submit(ready_session(), "1", config.clone()))
            .await
            .unwrap();
        executor
            .process(ConfirmTransfer {
                hash: submitted.hash,
                transfer: config.clone(),
            })
            .await
            .unwrap();

        provider.update(|s| s.confirmations = None);
        config.confirmation_timeout = Duration::from_millis(30);
        let err = executor
            .process(ConfirmTransfer {
                hash: submitted.hash,
                transfer: config,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::ConfirmationTimeout { hash, .. } if hash == submitted.hash));
    }

    #[tokio::test]
    async fn test_submission_does_not_wait_for_confirmations() {
        let provider = FakeWalletProvider::new(vec![ALICE], REQUIRED_CHAIN);
        provider.update(|s| s.confirmations = None);
        let executor = OnChainTransferExecutor::new(provider.clone());

        let mut config = test_settings().transfer;
        config.required_confirmations = 2;
        config.confirmation_timeout = Duration::from_secs(60);
        let submitted = tokio::time::timeout(
            Duration::from_secs(1),
            executor.process(submit(ready_session(), "1", config.clone())),
        )
        .await
        .expect("submission must return once the hash is known")
        .unwrap();
        assert_eq!(submitted.hash, crate::testing::H1);

        config.required_confirmations = 0;
        executor
            .process(ConfirmTransfer {
                hash: submitted.hash,
                transfer: config,
            })
            .await
            .unwrap();
    }
}
