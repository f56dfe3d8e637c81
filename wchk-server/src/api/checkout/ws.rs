use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use wchk_sdk::objects::{CheckoutToken, WsCloseCode, WsServerMessage};

use crate::api::ws::{close, send_json};
use crate::state::AppState;

/// `GET /checkouts/{token}/ws` — WebSocket saga progress stream.
///
/// Relays progress of every run against `token` that starts or continues
/// while the socket is open. The connection is closed normally after the
/// first terminal stage (`completed` or `failed`).
pub(super) async fn saga_progress_ws(
    state: State<AppState>,
    Path(token): Path<CheckoutToken>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_saga_ws(socket, app_state, token))
}

async fn handle_saga_ws(mut socket: WebSocket, state: AppState, token: CheckoutToken) {
    let mut progress_rx = state.saga.subscribe_progress();
    tracing::debug!(
        checkout_token = %token,
        in_flight = state.saga.is_in_flight(&token),
        "WS: saga progress stream opened"
    );

    loop {
        tokio::select! {
            result = progress_rx.recv() => {
                match result {
                    Ok(progress) if progress.checkout_token == token => {
                        let terminal = progress.stage.is_terminal();
                        if send_json(&mut socket, &WsServerMessage::Saga { progress }).await.is_err() {
                            return; // client gone
                        }
                        if terminal {
                            close(&mut socket, WsCloseCode::NORMAL, "finalization finished").await;
                            return;
                        }
                    }
                    Ok(_) => {
                        // Progress for a different checkout — ignore
                        continue;
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(
                            checkout_token = %token,
                            skipped = n,
                            "WS: progress receiver lagged"
                        );
                    }
                    Err(RecvError::Closed) => {
                        close(&mut socket, WsCloseCode::INTERNAL_ERROR, "progress stream closed").await;
                        return;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => {
                        // Ignore other client messages (text, binary, ping)
                    }
                }
            }
        }
    }
}
