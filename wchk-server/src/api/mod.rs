//! HTTP and WebSocket API handlers.
//!
//! # Endpoints
//!
//! - `GET  /wallet`                            – current wallet snapshot
//! - `POST /wallet/connect`                    – request account access
//! - `GET  /wallet/ws`                         – WebSocket wallet snapshot stream
//! - `GET  /checkouts/{token}`                 – checkout snapshot from the backend
//! - `PUT  /checkouts/{token}/billing-address` – forward a billing address
//! - `POST /checkouts/{token}/finalize`        – run the finalization saga
//! - `GET  /checkouts/{token}/ws`              – WebSocket saga progress stream

use axum::Router;

use crate::state::AppState;

mod checkout;
mod wallet;
mod ws;

/// Build the API router (nested under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(wallet::router())
        .merge(checkout::router())
}
