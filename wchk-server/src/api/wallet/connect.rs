use axum::{Json, extract::State, response::IntoResponse};

use super::WalletApiError;
use crate::state::AppState;

/// `GET /wallet` — the wallet session as of now.
pub(super) async fn get_wallet(state: State<AppState>) -> impl IntoResponse {
    Json(state.wallet.snapshot())
}

/// `POST /wallet/connect` — ask the wallet for account access.
///
/// A connected session on the wrong network is still a successful
/// connect; the returned snapshot says `connected_wrong_network`.
pub(super) async fn connect_wallet(
    state: State<AppState>,
) -> Result<impl IntoResponse, WalletApiError> {
    let snapshot = state.wallet.connect().await.map_err(WalletApiError)?;
    tracing::info!(state = ?snapshot.state, "Wallet connect handled");
    Ok(Json(snapshot))
}
