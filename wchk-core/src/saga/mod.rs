//! Checkout finalization saga.
//!
//! Three steps run in a fixed forward order, each gating the next:
//!
//! 1. [`PaymentAuthorizer`] registers a payment intent
//! 2. [`OnChainTransferExecutor`] has the wallet sign and broadcast the
//!    transfer, then waits for confirmations if configured
//! 3. [`CheckoutFinalizer`] converts the checkout into an order
//!
//! [`FinalizationSaga`] composes them. There is no compensation: a payment
//! intent stays registered when the transfer fails, and a submitted
//! transfer stays on chain when completion fails.

mod error;
mod finalization;
mod finalizer;
mod guard;
mod payment;
mod transfer;

pub use error::{SagaError, SagaStep};
pub use finalization::{FinalizationSaga, FinalizeOrder, SagaSuccess};
pub use finalizer::{CheckoutFinalizer, CompleteCheckout, CompletionError};
pub use guard::{InFlightGuard, InFlightRegistry};
pub use payment::{AuthorizePayment, PaymentAuthorizer};
pub use transfer::{
    ConfirmTransfer, OnChainTransferExecutor, SubmitTransfer, SubmittedTransfer, TransferError,
};
