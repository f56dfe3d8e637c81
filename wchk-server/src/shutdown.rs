//! Signal handling for graceful shutdown and config reload.

use crate::config::{ConfigLoader, LoadedConfig};
use crate::state::AppState;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C). If a handler cannot be
/// installed the other one is still awaited.
pub async fn shutdown_signal() {
    let sigterm = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::error!(error = %e, "Failed to install SIGTERM handler"));
    let sigint = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::error!(error = %e, "Failed to install SIGINT handler"));

    let term = async {
        match sigterm {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    let int = async {
        match sigint {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = term => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = int => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Only the checkout settings are swapped. The listen address, RPC endpoint
/// and backend endpoint are bound at startup; a change to them is logged
/// and takes effect after a restart.
///
/// Returns a Notify that stops the task.
pub fn spawn_config_reload_handler(
    state: AppState,
    config_loader: Arc<ConfigLoader>,
    startup: LoadedConfig,
) -> Arc<Notify> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler, config reload disabled");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            if startup.settings.network.rpc_url != loaded_config.settings.network.rpc_url {
                                tracing::warn!(
                                    rpc_url = %loaded_config.settings.network.rpc_url,
                                    "RPC endpoint changed; restart required for it to take effect"
                                );
                            }
                            if startup.backend != loaded_config.backend {
                                tracing::warn!("Backend settings changed; restart required for them to take effect");
                            }
                            if startup.server != loaded_config.server {
                                tracing::warn!("Server settings changed; restart required for them to take effect");
                            }

                            state.settings.replace(loaded_config.settings);
                            tracing::info!("Configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    });

    shutdown_notify
}
