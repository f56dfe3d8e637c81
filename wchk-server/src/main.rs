//! Wallet checkout finalizer server.
//!
//! Supervises the customer's wallet session and exposes the single
//! "finalize order" operation, which authorizes payment, has the wallet
//! sign the on-chain transfer and completes the checkout.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wchk_core::backend::{CheckoutBackend, GraphqlCheckoutBackend};
use wchk_core::config::SettingsStore;
use wchk_core::events::saga_progress_channel;
use wchk_core::saga::FinalizationSaga;
use wchk_core::wallet::{JsonRpcWalletProvider, WalletProvider, WalletSessionManager};

/// Wallet checkout finalizer
#[derive(Parser, Debug)]
#[command(name = "wchk-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "WCHK_CONFIG", default_value = "./wchk-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    tracing::info!("Starting wchk-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let listen_addr = loaded_config.server.listen;
    let network = loaded_config.settings.network.clone();
    let settings = SettingsStore::new(loaded_config.settings.clone());

    // Boundaries
    let provider: Arc<dyn WalletProvider> = Arc::new(
        JsonRpcWalletProvider::new(network.rpc_url.clone(), network.request_timeout)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to build wallet RPC client"))?,
    );
    let backend: Arc<dyn CheckoutBackend> = Arc::new(
        GraphqlCheckoutBackend::new(&loaded_config.backend)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to build backend client"))?,
    );
    tracing::info!(
        rpc_url = %network.rpc_url,
        backend_url = %loaded_config.backend.url,
        required_chain_id = %network.chain_id,
        "Boundaries configured"
    );

    // Wallet session
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (manager, wallet) = WalletSessionManager::new(Arc::clone(&provider), network.chain_id);
    let manager_handle = tokio::spawn(manager.run(shutdown_rx, settings.subscribe()));
    if loaded_config.server.auto_connect_wallet {
        // May wait on a wallet prompt, so it must not hold up the listener.
        let wallet = wallet.clone();
        tokio::spawn(async move {
            match wallet.connect().await {
                Ok(snapshot) => tracing::info!(state = ?snapshot.state, "Wallet auto-connected"),
                Err(e) => tracing::warn!(error = %e, "Wallet auto-connect failed"),
            }
        });
    }

    // Saga
    let (progress_tx, _) = saga_progress_channel();
    let saga = FinalizationSaga::new(
        Arc::clone(&backend),
        provider,
        wallet.clone(),
        settings.clone(),
        progress_tx,
    );

    let state = AppState::new(Arc::new(saga), wallet, backend, settings);

    // Spawn config reload handler (listens for SIGHUP)
    let reload_stop = spawn_config_reload_handler(state.clone(), config_loader, loaded_config);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    reload_stop.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = manager_handle.await {
        tracing::error!(error = %e, "Wallet session manager task failed");
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wchk_core=debug,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
