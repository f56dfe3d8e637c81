//! JSON-RPC wallet provider.
//!
//! Talks EIP-1193 style JSON-RPC over HTTP to a wallet endpoint (a local
//! signer, a wallet bridge, or a node with unlocked accounts). Account and
//! network changes are detected by polling `eth_accounts` / `eth_chainId`,
//! with an interval that tightens right after a change and backs off when
//! the wallet is idle.

use super::provider::{ProviderError, ProviderSubscription, TransactionRequest, WalletProvider};
use crate::events::{ProviderEvent, ProviderEventSender, provider_event_channel};
use crate::utils::polling_interval::polling_freq;
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;
use wchk_sdk::objects::ChainId;

/// EIP-1193 provider error codes.
mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptStub {
    block_number: Option<String>,
    status: Option<String>,
}

struct RpcClient {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl RpcClient {
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "JSON-RPC request");

        let response = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let envelope: RpcResponse = response.json().await?;
        if let Some(err) = envelope.error {
            return Err(classify_rpc_error(err));
        }
        serde_json::from_value(envelope.result)
            .map_err(|e| ProviderError::Parse(format!("{method}: {e}")))
    }

}

/// The two reads the wallet watcher polls.
#[async_trait]
trait WalletIdentitySource: Send + Sync + 'static {
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;
    async fn chain_id(&self) -> Result<ChainId, ProviderError>;
}

#[async_trait]
impl WalletIdentitySource for RpcClient {
    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.call("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        ChainId::from_str(&raw).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_connect() || err.is_timeout() {
        ProviderError::Unavailable(err.to_string())
    } else {
        ProviderError::Request(err)
    }
}

fn classify_rpc_error(err: RpcErrorObject) -> ProviderError {
    match err.code {
        codes::USER_REJECTED => ProviderError::UserRejected,
        codes::UNAUTHORIZED | codes::DISCONNECTED | codes::CHAIN_DISCONNECTED => {
            ProviderError::Unavailable(err.message)
        }
        _ if err.message.to_ascii_lowercase().contains("insufficient funds") => {
            ProviderError::InsufficientFunds(err.message)
        }
        code => ProviderError::Rpc {
            code,
            message: err.message,
        },
    }
}

fn parse_quantity(method: &str, raw: &str) -> Result<U256, ProviderError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::Parse(format!("{method}: expected hex quantity, got {raw:?}")))?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::Parse(format!("{method}: {e}")))
}

/// [`WalletProvider`] over HTTP JSON-RPC.
pub struct JsonRpcWalletProvider {
    rpc: Arc<RpcClient>,
}

impl JsonRpcWalletProvider {
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_http_client(url, http))
    }

    pub fn with_http_client(url: Url, http: reqwest::Client) -> Self {
        Self {
            rpc: Arc::new(RpcClient {
                http,
                url,
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    #[tracing::instrument(skip_all, err, name = "RPC:RequestAccounts")]
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.rpc.call("eth_requestAccounts", json!([])).await
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.rpc.accounts().await
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        self.rpc.chain_id().await
    }

    #[tracing::instrument(skip_all, err, name = "RPC:GetBalance")]
    async fn balance(&self, address: &str) -> Result<U256, ProviderError> {
        let raw: String = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity("eth_getBalance", &raw)
    }

    #[tracing::instrument(skip_all, err, name = "RPC:SendTransaction")]
    async fn sign_and_send(&self, request: TransactionRequest) -> Result<B256, ProviderError> {
        let mut tx = serde_json::Map::new();
        tx.insert("from".into(), json!(request.from.to_string()));
        tx.insert("to".into(), json!(request.to.to_string()));
        tx.insert("value".into(), json!(format!("{:#x}", request.value)));
        if let Some(data) = &request.data {
            tx.insert("data".into(), json!(data.to_string()));
        }
        if let Some(gas) = request.gas_limit {
            tx.insert("gas".into(), json!(format!("{gas:#x}")));
        }

        let hash: String = self
            .rpc
            .call("eth_sendTransaction", Value::Array(vec![Value::Object(tx)]))
            .await?;
        B256::from_str(&hash).map_err(|e| ProviderError::Parse(format!("eth_sendTransaction: {e}")))
    }

    async fn confirmations(&self, tx_hash: B256) -> Result<Option<u64>, ProviderError> {
        let receipt: Option<ReceiptStub> = self
            .rpc
            .call("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        if receipt.status.as_deref() == Some("0x0") {
            return Err(ProviderError::Reverted(tx_hash));
        }
        let Some(mined_at) = receipt.block_number else {
            return Ok(None);
        };

        let mined_at = parse_quantity("eth_getTransactionReceipt", &mined_at)?;
        let raw_head: String = self.rpc.call("eth_blockNumber", json!([])).await?;
        let head = parse_quantity("eth_blockNumber", &raw_head)?;
        let depth = head.saturating_sub(mined_at).saturating_add(U256::from(1u64));
        Ok(Some(u64::try_from(depth).unwrap_or(u64::MAX)))
    }

    fn subscribe(&self) -> ProviderSubscription {
        let (event_tx, event_rx) = provider_event_channel();
        let watcher = tokio::spawn(watch_wallet(Arc::clone(&self.rpc), event_tx));
        ProviderSubscription::new(event_rx, Some(watcher))
    }
}

/// Poll the wallet and emit an event whenever accounts or chain differ from
/// the previous observation. The baseline is read before the first sleep, so
/// a change made right after subscribing is still reported.
async fn watch_wallet<S: WalletIdentitySource>(source: Arc<S>, events: ProviderEventSender) {
    let mut last_accounts: Option<Vec<String>> = source.accounts().await.ok();
    let mut last_chain: Option<ChainId> = source.chain_id().await.ok();
    let mut last_change = Instant::now();

    loop {
        tokio::time::sleep(polling_freq(last_change.elapsed())).await;

        match source.accounts().await {
            Ok(accounts) if last_accounts.as_ref() != Some(&accounts) => {
                // A failed baseline read leaves nothing to compare against.
                let is_baseline = last_accounts.is_none();
                last_accounts = Some(accounts.clone());
                if !is_baseline {
                    last_change = Instant::now();
                    if events.send(ProviderEvent::AccountsChanged(accounts)).await.is_err() {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Wallet accounts poll failed"),
        }

        match source.chain_id().await {
            Ok(chain_id) if last_chain != Some(chain_id) => {
                let is_baseline = last_chain.is_none();
                last_chain = Some(chain_id);
                if !is_baseline {
                    last_change = Instant::now();
                    if events.send(ProviderEvent::ChainChanged(chain_id)).await.is_err() {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Wallet chain poll failed"),
        }

        if events.is_closed() {
            return;
        }
    }
}
