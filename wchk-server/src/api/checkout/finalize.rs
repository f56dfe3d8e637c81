use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kanau::processor::Processor;
use wchk_core::saga::{FinalizeOrder, SagaError};
use wchk_sdk::objects::{CheckoutToken, FailureKind, FinalizeFailure, FinalizeOutcome};

use super::{CheckoutApiError, load_checkout};
use crate::state::AppState;

/// `POST /checkouts/{token}/finalize` — the "finalize order" entry point.
///
/// Fetches the checkout snapshot and runs the finalization saga against it.
/// The saga outcome is always the response body:
///
/// - `200 OK` with `status: "success"`
/// - `404 Not Found` with reason `checkout_not_found` for an unknown token
/// - `409 Conflict` when a run for this token is already in flight
/// - `422 Unprocessable Entity` for every other saga failure
pub(super) async fn finalize(
    state: State<AppState>,
    Path(token): Path<CheckoutToken>,
) -> Result<Response, CheckoutApiError> {
    let checkout = match load_checkout(&state, &token).await {
        Ok(checkout) => checkout,
        Err(CheckoutApiError::NotFound) => {
            tracing::warn!(checkout_token = %token, "Finalize requested for unknown checkout");
            let failure = FinalizeFailure {
                reason: FailureKind::CheckoutNotFound,
                cause: None,
                message: format!("checkout {token} not found"),
                errors: Vec::new(),
            };
            return Ok((StatusCode::NOT_FOUND, Json(FinalizeOutcome::Failure(failure))).into_response());
        }
        Err(e) => return Err(e),
    };

    // The run lives on its own task so that a client disconnect cannot
    // cancel it between the transfer and the completion step.
    let saga = state.saga.clone();
    let result = tokio::spawn(async move { saga.process(FinalizeOrder { checkout }).await })
        .await
        .map_err(|e| CheckoutApiError::Internal(e.to_string()))?;

    let response = match result {
        Ok(success) => (StatusCode::OK, Json(success.into_outcome())),
        Err(e) => {
            let status = match e {
                SagaError::AlreadyInProgress(_) => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(FinalizeOutcome::Failure(e.to_failure())))
        }
    };
    Ok(response.into_response())
}
