use std::time::Duration;
use url::Url;
use wchk_sdk::objects::ChainId;

/// The network the merchant accepts payments on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Chain id a session must report to be considered `ConnectedReady`.
    pub chain_id: ChainId,
    /// JSON-RPC endpoint of the wallet provider. Read once at startup.
    pub rpc_url: Url,
    pub request_timeout: Duration,
}
