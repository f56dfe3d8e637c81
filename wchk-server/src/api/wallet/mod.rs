//! Wallet session endpoints.

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use wchk_core::wallet::WalletError;

use crate::state::AppState;

mod connect;
mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(connect::get_wallet))
        .route("/wallet/connect", post(connect::connect_wallet))
        .route("/wallet/ws", get(ws::wallet_ws))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in wallet API handlers.
#[derive(Debug)]
struct WalletApiError(WalletError);

impl IntoResponse for WalletApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            WalletError::NotConnected => StatusCode::CONFLICT,
            WalletError::UserRejected => StatusCode::FORBIDDEN,
            WalletError::WalletUnavailable(_) | WalletError::ManagerStopped => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WalletError::Provider(e) => {
                tracing::error!(error = %e, "Wallet API provider error");
                StatusCode::BAD_GATEWAY
            }
        };
        (status, self.0.to_string()).into_response()
    }
}
