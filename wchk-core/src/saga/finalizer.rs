//! CheckoutFinalizer: the last, irreversible saga step.

use crate::backend::{BackendError, CheckoutBackend};
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use wchk_sdk::objects::{CheckoutToken, FieldError, OrderReference};

/// Errors that can occur completing a checkout.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The completion call itself failed.
    #[error("checkout completion request failed: {0}")]
    Transport(#[from] BackendError),

    /// The backend answered with field errors and no order.
    #[error("checkout completion rejected: {}", super::error::join_field_errors(.errors))]
    Rejected { errors: Vec<FieldError> },
}

#[derive(Debug, Clone)]
pub struct CompleteCheckout {
    pub checkout_token: CheckoutToken,
}

/// Converts a paid checkout into an order.
///
/// An order in the reply is success even if errors accompany it. A reply
/// with neither an order nor an error is passed through as
/// `OrderReference { created: false }` for the saga to report.
pub struct CheckoutFinalizer {
    backend: Arc<dyn CheckoutBackend>,
}

impl CheckoutFinalizer {
    pub fn new(backend: Arc<dyn CheckoutBackend>) -> Self {
        Self { backend }
    }
}

impl Processor<CompleteCheckout> for CheckoutFinalizer {
    type Output = OrderReference;
    type Error = CompletionError;

    async fn process(&self, input: CompleteCheckout) -> Result<OrderReference, CompletionError> {
        let response = self.backend.complete_checkout(&input.checkout_token).await?;
        if response.order_id.is_none() && !response.errors.is_empty() {
            return Err(CompletionError::Rejected {
                errors: response.errors,
            });
        }
        if !response.errors.is_empty() {
            warn!(
                checkout_token = %input.checkout_token,
                errors = %super::error::join_field_errors(&response.errors),
                "Checkout completed with errors"
            );
        }

        let reference = OrderReference::from_order_id(response.order_id);
        match &reference.order_id {
            Some(order_id) => info!(
                checkout_token = %input.checkout_token,
                order_id = %order_id,
                "Checkout completed"
            ),
            None => warn!(
                checkout_token = %input.checkout_token,
                "Checkout completion returned no order and no error"
            ),
        }
        Ok(reference)
    }
}
