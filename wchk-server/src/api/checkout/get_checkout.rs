use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use wchk_sdk::objects::CheckoutToken;

use super::{CheckoutApiError, load_checkout};
use crate::state::AppState;

/// `GET /checkouts/{token}` — the checkout as the backend reports it.
pub(super) async fn get_checkout(
    state: State<AppState>,
    Path(token): Path<CheckoutToken>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let checkout = load_checkout(&state, &token).await?;
    Ok(Json(checkout))
}
