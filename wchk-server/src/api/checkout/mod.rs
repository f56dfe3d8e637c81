//! Checkout endpoints: snapshot lookup, billing address glue, the
//! "finalize order" entry point and its progress stream.

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use wchk_core::backend::BackendError;
use wchk_sdk::objects::{CheckoutSnapshot, CheckoutToken};

use crate::state::AppState;

mod billing_address;
mod finalize;
mod get_checkout;
mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkouts/{token}", get(get_checkout::get_checkout))
        .route(
            "/checkouts/{token}/billing-address",
            put(billing_address::update_billing_address),
        )
        .route("/checkouts/{token}/finalize", post(finalize::finalize))
        .route("/checkouts/{token}/ws", get(ws::saga_progress_ws))
}

/// Fetch the checkout or fail with `NotFound`.
async fn load_checkout(
    state: &AppState,
    token: &CheckoutToken,
) -> Result<CheckoutSnapshot, CheckoutApiError> {
    state
        .backend
        .fetch_checkout(token)
        .await
        .map_err(CheckoutApiError::Backend)?
        .ok_or(CheckoutApiError::NotFound)
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in checkout API handlers.
///
/// Saga failures are not errors at this level; they are reported in the
/// finalize response body.
#[derive(Debug)]
enum CheckoutApiError {
    /// The commerce backend failed.
    Backend(BackendError),
    /// The backend knows no checkout with this token.
    NotFound,
    /// The saga task ended without producing an outcome.
    Internal(String),
}

impl IntoResponse for CheckoutApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            CheckoutApiError::Backend(e) => {
                tracing::error!(error = %e, "Checkout API backend error");
                (StatusCode::BAD_GATEWAY, "commerce backend error").into_response()
            }
            CheckoutApiError::NotFound => {
                (StatusCode::NOT_FOUND, "checkout not found").into_response()
            }
            CheckoutApiError::Internal(e) => {
                tracing::error!(error = %e, "Checkout API internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
