use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use wchk_sdk::objects::{WsCloseCode, WsServerMessage};

use crate::api::ws::{close, send_json};
use crate::state::AppState;

/// `GET /wallet/ws` — WebSocket wallet snapshot stream.
///
/// The first frame is always the current snapshot; a frame follows every
/// published change. If the session manager stops, an error frame is sent
/// and the connection is closed with [`WsCloseCode::WALLET_STOPPED`].
pub(super) async fn wallet_ws(state: State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_wallet_ws(socket, app_state))
}

async fn handle_wallet_ws(mut socket: WebSocket, state: AppState) {
    let mut snapshot_rx = state.wallet.subscribe();

    // --- Send current snapshot as the first message ------------------------
    let current = snapshot_rx.borrow_and_update().clone();
    if send_json(&mut socket, &WsServerMessage::Wallet { wallet: current })
        .await
        .is_err()
    {
        return;
    }

    // --- Relay changes until the manager stops or the client leaves --------
    loop {
        tokio::select! {
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    tracing::debug!("WS: wallet session manager stopped");
                    let frame = WsServerMessage::Error {
                        code: WsCloseCode::WALLET_STOPPED,
                        reason: "wallet session manager stopped".into(),
                    };
                    let _ = send_json(&mut socket, &frame).await;
                    close(&mut socket, WsCloseCode::WALLET_STOPPED, "wallet stopped").await;
                    return;
                }
                let wallet = snapshot_rx.borrow_and_update().clone();
                if send_json(&mut socket, &WsServerMessage::Wallet { wallet }).await.is_err() {
                    return; // client gone
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
