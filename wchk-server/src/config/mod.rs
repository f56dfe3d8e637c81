//! Configuration module for wchk-server.
//!
//! Handles loading configuration from the TOML file and CLI arguments and
//! validating it into the runtime types of `wchk-core`.

pub mod file;

use crate::config::file::{AssetConfig, ChainIdValue, FileConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use wchk_core::config::{
    AssetKind, BackendConfig, CheckoutSettings, GatewayConfig, NetworkConfig, SagaTimeouts,
    TransferConfig,
};
use wchk_sdk::objects::ChainId;

/// 10^77 is the largest power of ten that fits into 256 bits.
const MAX_DECIMALS: u32 = 77;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Server-level settings that are only read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Connect the wallet session once at startup.
    pub auto_connect_wallet: bool,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    /// The reloadable part.
    pub settings: CheckoutSettings,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read, override, validate and convert the configuration file.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_loaded_config(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn parse_chain_id(value: &ChainIdValue) -> Result<ChainId, ConfigError> {
    match value {
        ChainIdValue::Number(n) => Ok(ChainId(*n)),
        ChainIdValue::Text(s) => {
            ChainId::from_str(s).map_err(|e| ConfigError::ValidationError(e.to_string()))
        }
    }
}

fn secs(name: &str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(Duration::from_secs(value))
}

fn build_loaded_config(file: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let chain_id = parse_chain_id(&file.network.chain_id)?;

    if file.transfer.destination.is_zero() {
        return Err(ConfigError::ValidationError(
            "transfer destination must not be the zero address".into(),
        ));
    }
    if file.transfer.decimals > MAX_DECIMALS {
        return Err(ConfigError::ValidationError(format!(
            "transfer decimals must be at most {MAX_DECIMALS}, got {}",
            file.transfer.decimals
        )));
    }
    if file.gateway.id.trim().is_empty() {
        return Err(ConfigError::ValidationError("gateway id must not be empty".into()));
    }

    let timeouts = SagaTimeouts {
        payment: secs("timeouts.payment_secs", file.timeouts.payment_secs)?,
        transfer: secs("timeouts.transfer_secs", file.timeouts.transfer_secs)?,
        completion: secs("timeouts.completion_secs", file.timeouts.completion_secs)?,
    };
    let confirmation_timeout = secs(
        "transfer.confirmation_timeout_secs",
        file.transfer.confirmation_timeout_secs,
    )?;

    let asset = match file.transfer.asset {
        AssetConfig::Native => AssetKind::Native,
        AssetConfig::Erc20 { contract } => AssetKind::Erc20 { contract },
    };

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file.server.listen,
            auto_connect_wallet: file.network.auto_connect,
        },
        backend: BackendConfig {
            url: file.backend.url,
            auth_token: file.backend.auth_token,
            request_timeout: secs("backend.request_timeout_secs", file.backend.request_timeout_secs)?,
        },
        settings: CheckoutSettings {
            network: NetworkConfig {
                chain_id,
                rpc_url: file.network.rpc_url,
                request_timeout: secs(
                    "network.request_timeout_secs",
                    file.network.request_timeout_secs,
                )?,
            },
            transfer: TransferConfig {
                destination: file.transfer.destination,
                asset,
                decimals: file.transfer.decimals,
                gas_limit: file.transfer.gas_limit,
                required_confirmations: file.transfer.required_confirmations,
                confirmation_timeout,
                confirmation_poll_interval: secs(
                    "transfer.confirmation_poll_interval_secs",
                    file.transfer.confirmation_poll_interval_secs,
                )?,
            },
            gateway: GatewayConfig {
                id: file.gateway.id,
                payment_token: file.gateway.payment_token,
            },
            timeouts,
        },
    })
}
