//! Remote commerce backend boundary.

mod graphql;

pub use graphql::GraphqlCheckoutBackend;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use wchk_sdk::objects::{Address, CheckoutSnapshot, CheckoutToken, FieldError, OrderId};

/// Errors that can occur talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Top-level GraphQL `errors`
    #[error("GraphQL error: {0}")]
    Graphql(String),

    /// Response did not have the expected shape
    #[error("malformed backend response: {0}")]
    Parse(String),
}

/// Registration of a payment intent against a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    pub checkout_token: CheckoutToken,
    pub gateway: String,
    pub amount: Decimal,
    /// Gateway-specific payment token, forwarded as-is.
    pub payment_token: Option<String>,
}

/// Reply of the completion mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResponse {
    pub order_id: Option<OrderId>,
    pub errors: Vec<FieldError>,
}

/// Operations the checkout flow needs from the commerce backend.
///
/// Field-level validation problems are returned as `Ok` with a non-empty
/// error list; `Err` is reserved for transport and protocol failures.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    /// `None` if the backend knows no checkout with this token.
    async fn fetch_checkout(
        &self,
        token: &CheckoutToken,
    ) -> Result<Option<CheckoutSnapshot>, BackendError>;

    /// Not idempotent: every call may register another intent.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<Vec<FieldError>, BackendError>;

    async fn complete_checkout(
        &self,
        token: &CheckoutToken,
    ) -> Result<CompletionResponse, BackendError>;

    async fn update_billing_address(
        &self,
        token: &CheckoutToken,
        address: &Address,
    ) -> Result<Vec<FieldError>, BackendError>;
}
