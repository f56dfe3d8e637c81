//! PaymentAuthorizer: step one of the finalization saga.

use crate::backend::{CheckoutBackend, PaymentIntentRequest};
use crate::config::GatewayConfig;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};
use wchk_sdk::objects::{CheckoutToken, PaymentIntentResult};

#[derive(Debug, Clone)]
/// Register a payment intent for the checkout total.
pub struct AuthorizePayment {
    pub checkout_token: CheckoutToken,
    pub amount: Decimal,
    pub gateway: GatewayConfig,
}

/// Registers payment intents with the commerce backend.
///
/// Never fails as a processor: an unreachable backend is reported as
/// `accepted = false` with no field errors, so the caller can tell it apart
/// from a rejection.
pub struct PaymentAuthorizer {
    backend: Arc<dyn CheckoutBackend>,
}

impl PaymentAuthorizer {
    pub fn new(backend: Arc<dyn CheckoutBackend>) -> Self {
        Self { backend }
    }
}

impl Processor<AuthorizePayment> for PaymentAuthorizer {
    type Output = PaymentIntentResult;
    type Error = Infallible;

    async fn process(&self, input: AuthorizePayment) -> Result<PaymentIntentResult, Infallible> {
        let request = PaymentIntentRequest {
            checkout_token: input.checkout_token,
            gateway: input.gateway.id,
            amount: input.amount,
            payment_token: input.gateway.payment_token,
        };

        match self.backend.create_payment_intent(&request).await {
            Ok(errors) => {
                let result = PaymentIntentResult::from_errors(errors);
                if result.accepted {
                    info!(
                        checkout_token = %request.checkout_token,
                        gateway = %request.gateway,
                        amount = %request.amount,
                        "Payment intent registered"
                    );
                } else {
                    warn!(
                        checkout_token = %request.checkout_token,
                        errors = result.errors.len(),
                        "Payment intent rejected by backend"
                    );
                }
                Ok(result)
            }
            Err(e) => {
                error!(
                    checkout_token = %request.checkout_token,
                    error = %e,
                    "Payment intent registration failed"
                );
                Ok(PaymentIntentResult::unreachable())
            }
        }
    }
}
