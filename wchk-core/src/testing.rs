//! Scripted fakes of the wallet provider and commerce backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::backend::{BackendError, CheckoutBackend, CompletionResponse, PaymentIntentRequest};
use crate::config::{
    AssetKind, CheckoutSettings, GatewayConfig, NetworkConfig, SagaTimeouts, TransferConfig,
};
use crate::events::{ProviderEvent, ProviderEventSender, provider_event_channel};
use crate::wallet::{ProviderError, ProviderSubscription, TransactionRequest, WalletProvider};
use alloy_primitives::{B256, U256, address, b256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wchk_sdk::objects::{
    Address, ChainId, CheckoutSnapshot, CheckoutToken, FieldError, Money, OrderId,
};

pub const REQUIRED_CHAIN: ChainId = ChainId(513100);
pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";
pub const H1: B256 = b256!("0x00000000000000000000000000000000000000000000000000000000000000a1");

pub fn test_settings() -> CheckoutSettings {
    CheckoutSettings {
        network: NetworkConfig {
            chain_id: REQUIRED_CHAIN,
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
            request_timeout: Duration::from_secs(30),
        },
        transfer: TransferConfig {
            destination: address!("0x79Cf4A56E0eC0d0AeEC1307E84a2A116e7500C22"),
            asset: AssetKind::Erc20 {
                contract: address!("0x2282443A094BD107F0C6D0070146B123C4a02013"),
            },
            decimals: 18,
            gas_limit: Some(2_100_000),
            required_confirmations: 0,
            confirmation_timeout: Duration::from_secs(5),
            confirmation_poll_interval: Duration::from_millis(10),
        },
        gateway: GatewayConfig {
            id: "G".into(),
            payment_token: None,
        },
        timeouts: SagaTimeouts::default(),
    }
}

pub fn checkout(token: &str, amount: &str) -> CheckoutSnapshot {
    CheckoutSnapshot {
        token: CheckoutToken::new(token),
        total_price: Money {
            amount: Decimal::from_str(amount).unwrap(),
            currency: "HF".into(),
        },
        billing_address: None,
    }
}

// ---------------------------------------------------------------------------
// FakeWalletProvider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Succeed,
    Reject,
    InsufficientFunds,
}

pub struct FakeWalletState {
    pub accounts: Vec<String>,
    pub chain_id: ChainId,
    pub balance: U256,
    pub reject_accounts: bool,
    pub unavailable: bool,
    pub send: SendBehavior,
    pub confirmations: Option<u64>,
    sent: Vec<TransactionRequest>,
    calls: HashMap<&'static str, usize>,
}

pub struct FakeWalletProvider {
    state: Mutex<FakeWalletState>,
    events: Mutex<Option<ProviderEventSender>>,
}

impl FakeWalletProvider {
    pub fn new(accounts: Vec<&str>, chain_id: ChainId) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeWalletState {
                accounts: accounts.into_iter().map(String::from).collect(),
                chain_id,
                balance: U256::ZERO,
                reject_accounts: false,
                unavailable: false,
                send: SendBehavior::Succeed,
                confirmations: None,
                sent: Vec::new(),
                calls: HashMap::new(),
            }),
            events: Mutex::new(None),
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeWalletState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Whether a subscription handed out by `subscribe` is still alive.
    pub fn is_subscribed(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// End the current subscription from the provider side.
    pub fn end_subscription(&self) {
        self.events.lock().unwrap().take();
    }

    pub async fn emit(&self, event: ProviderEvent) {
        let tx = self.events.lock().unwrap().clone();
        tx.expect("no active subscription").send(event).await.unwrap();
    }

    fn record(&self, method: &'static str) -> std::sync::MutexGuard<'_, FakeWalletState> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        state
    }
}

#[async_trait]
impl WalletProvider for FakeWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let state = self.record("eth_requestAccounts");
        if state.unavailable {
            return Err(ProviderError::Unavailable("no wallet".into()));
        }
        if state.reject_accounts {
            return Err(ProviderError::UserRejected);
        }
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.record("eth_accounts").accounts.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        Ok(self.record("eth_chainId").chain_id)
    }

    async fn balance(&self, _address: &str) -> Result<U256, ProviderError> {
        Ok(self.record("eth_getBalance").balance)
    }

    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError> {
        let mut state = self.record("eth_sendTransaction");
        match state.send {
            SendBehavior::Succeed => {
                state.sent.push(request);
                Ok(H1)
            }
            SendBehavior::Reject => Err(ProviderError::UserRejected),
            SendBehavior::InsufficientFunds => {
                Err(ProviderError::InsufficientFunds("balance too low".into()))
            }
        }
    }

    async fn confirmations(&self, _tx_hash: B256) -> Result<Option<u64>, ProviderError> {
        Ok(self.record("eth_getTransactionReceipt").confirmations)
    }

    fn subscribe(&self) -> ProviderSubscription {
        drop(self.record("subscribe"));
        let (tx, rx) = provider_event_channel();
        *self.events.lock().unwrap() = Some(tx);
        ProviderSubscription::new(rx, None)
    }
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

pub struct FakeBackendState {
    /// `None` makes the call fail at the transport level.
    pub intent_reply: Option<Vec<FieldError>>,
    pub intent_delay: Option<Duration>,
    /// `None` makes the call fail at the transport level.
    pub completion_reply: Option<CompletionResponse>,
    pub checkout: Option<CheckoutSnapshot>,
    pub address_errors: Vec<FieldError>,
    intents: Vec<PaymentIntentRequest>,
    addresses: Vec<Address>,
    calls: Vec<&'static str>,
}

pub struct FakeBackend {
    state: Mutex<FakeBackendState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeBackendState {
                intent_reply: Some(Vec::new()),
                intent_delay: None,
                completion_reply: Some(CompletionResponse {
                    order_id: Some(OrderId("O1".into())),
                    errors: Vec::new(),
                }),
                checkout: Some(checkout("T1", "100.00")),
                address_errors: Vec::new(),
                intents: Vec::new(),
                addresses: Vec::new(),
                calls: Vec::new(),
            }),
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeBackendState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn intents(&self) -> Vec<PaymentIntentRequest> {
        self.state.lock().unwrap().intents.clone()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.state.lock().unwrap().addresses.clone()
    }

    fn unreachable() -> BackendError {
        BackendError::Status {
            status: 503,
            body: "service unavailable".into(),
        }
    }
}

#[async_trait]
impl CheckoutBackend for FakeBackend {
    async fn fetch_checkout(
        &self,
        token: &CheckoutToken,
    ) -> Result<Option<CheckoutSnapshot>, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state.checkout.clone().filter(|c| &c.token == token))
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<Vec<FieldError>, BackendError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("create_payment_intent");
            state.intents.push(request.clone());
            state.intent_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .intent_reply
            .clone()
            .ok_or_else(Self::unreachable)
    }

    async fn complete_checkout(
        &self,
        _token: &CheckoutToken,
    ) -> Result<CompletionResponse, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("complete_checkout");
        state.completion_reply.clone().ok_or_else(Self::unreachable)
    }

    async fn update_billing_address(
        &self,
        _token: &CheckoutToken,
        address: &Address,
    ) -> Result<Vec<FieldError>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("update_billing_address");
        state.addresses.push(address.clone());
        Ok(state.address_errors.clone())
    }
}
