//! TOML file configuration structures.
//!
//! These structs directly map to the `wchk-config.toml` file format.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub transfer: TransferConfig,
    pub gateway: GatewayConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// A chain id written either as an integer or as a `0x` hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainIdValue {
    Number(u64),
    Text(String),
}

/// Wallet network section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: ChainIdValue,
    /// JSON-RPC endpoint of the wallet provider.
    pub rpc_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Request wallet access once at startup instead of waiting for the
    /// first `POST /wallet/connect`.
    #[serde(default)]
    pub auto_connect: bool,
}

/// Asset sent to the merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetConfig {
    Native,
    Erc20 { contract: Address },
}

/// On-chain transfer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Merchant address receiving the funds.
    pub destination: Address,
    pub asset: AssetConfig,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// `0` proceeds to completion as soon as the transfer is submitted.
    #[serde(default)]
    pub required_confirmations: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_confirmation_poll_interval_secs")]
    pub confirmation_poll_interval_secs: u64,
}

/// Payment gateway section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub id: String,
    #[serde(default)]
    pub payment_token: Option<String>,
}

/// Commerce backend section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// GraphQL endpoint.
    pub url: Url,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Per-step saga timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_payment_secs")]
    pub payment_secs: u64,
    #[serde(default = "default_transfer_secs")]
    pub transfer_secs: u64,
    #[serde(default = "default_completion_secs")]
    pub completion_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            payment_secs: default_payment_secs(),
            transfer_secs: default_transfer_secs(),
            completion_secs: default_completion_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_decimals() -> u32 {
    18
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_confirmation_poll_interval_secs() -> u64 {
    3
}

fn default_payment_secs() -> u64 {
    30
}

fn default_transfer_secs() -> u64 {
    300
}

fn default_completion_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
listen = "127.0.0.1:3000"

[network]
chain_id = 513100
rpc_url = "http://127.0.0.1:8545"

[transfer]
destination = "0x79Cf4A56E0eC0d0AeEC1307E84a2A116e7500C22"
decimals = 18
gas_limit = 2100000

[transfer.asset]
kind = "erc20"
contract = "0x2282443A094BD107F0C6D0070146B123C4a02013"

[gateway]
id = "mirumee.payments.dummy"

[backend]
url = "https://shop.example.com/graphql/"
"#;

    #[test]
    fn test_config_parsing() {
        let config: FileConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert!(matches!(config.network.chain_id, ChainIdValue::Number(513100)));
        assert!(matches!(config.transfer.asset, AssetConfig::Erc20 { .. }));
        assert_eq!(config.transfer.gas_limit, Some(2_100_000));
        assert_eq!(config.transfer.required_confirmations, 0);
        assert_eq!(config.gateway.id, "mirumee.payments.dummy");
        assert_eq!(config.timeouts.transfer_secs, 300);
        assert!(!config.network.auto_connect);
    }

    #[test]
    fn test_auto_connect_flag() {
        let with_flag = SAMPLE.replace(
            "rpc_url = \"http://127.0.0.1:8545\"",
            "rpc_url = \"http://127.0.0.1:8545\"\nauto_connect = true",
        );
        let config: FileConfig = toml::from_str(&with_flag).unwrap();
        assert!(config.network.auto_connect);
    }

    #[test]
    fn test_hex_chain_id_and_native_asset() {
        let toml_str = r#"
[network]
chain_id = "0x7d44c"
rpc_url = "http://127.0.0.1:8545"

[transfer]
destination = "0x79Cf4A56E0eC0d0AeEC1307E84a2A116e7500C22"
asset = { kind = "native" }

[gateway]
id = "G"

[backend]
url = "https://shop.example.com/graphql/"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert!(matches!(config.network.chain_id, ChainIdValue::Text(ref s) if s == "0x7d44c"));
        assert!(matches!(config.transfer.asset, AssetConfig::Native));
        assert_eq!(config.transfer.decimals, 18);
    }
}
