//! Saga-level errors and their mapping onto the wire outcome.

use super::finalizer::CompletionError;
use super::transfer::TransferError;
use crate::backend::BackendError;
use crate::wallet::ProviderError;
use std::fmt;
use thiserror::Error;
use wchk_sdk::objects::{CheckoutToken, FailureKind, FieldError, FinalizeFailure};

/// The step a saga run was executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    PaymentAuthorization,
    TransferSubmission,
    CheckoutCompletion,
}

impl SagaStep {
    /// The failure kind reported when this step does not succeed.
    pub fn failure_kind(self) -> FailureKind {
        match self {
            SagaStep::PaymentAuthorization => FailureKind::PaymentAuthorizationFailed,
            SagaStep::TransferSubmission => FailureKind::TransferSubmissionFailed,
            SagaStep::CheckoutCompletion => FailureKind::CheckoutCompletionFailed,
        }
    }
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SagaStep::PaymentAuthorization => "payment authorization",
            SagaStep::TransferSubmission => "transfer submission",
            SagaStep::CheckoutCompletion => "checkout completion",
        })
    }
}

pub(crate) fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_missing_order(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        "order was not created".to_string()
    } else {
        format!("order was not created: {}", join_field_errors(errors))
    }
}

fn describe_payment_failure(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        "backend unreachable".to_string()
    } else {
        join_field_errors(errors)
    }
}

/// Why a saga run terminated without an order.
#[derive(Debug, Error)]
pub enum SagaError {
    #[error("a finalization run for checkout {0} is already in progress")]
    AlreadyInProgress(CheckoutToken),

    /// Empty `errors` means the backend could not be reached.
    #[error("payment authorization failed: {}", describe_payment_failure(.errors))]
    PaymentAuthorizationFailed { errors: Vec<FieldError> },

    #[error("transfer submission failed: {0}")]
    TransferSubmissionFailed(#[source] TransferError),

    /// The completion call did not get an answer from the backend.
    #[error("checkout completion request failed: {0}")]
    CheckoutCompletionFailed(#[source] BackendError),

    /// The backend answered the completion call without an order, with or
    /// without field errors.
    #[error("{}", describe_missing_order(.errors))]
    OrderNotCreated { errors: Vec<FieldError> },

    #[error("{step} timed out")]
    TimedOut { step: SagaStep },
}

impl SagaError {
    /// Top-level kind shown to the user.
    pub fn kind(&self) -> FailureKind {
        match self {
            SagaError::AlreadyInProgress(_) => FailureKind::AlreadyInProgress,
            SagaError::PaymentAuthorizationFailed { .. } => FailureKind::PaymentAuthorizationFailed,
            SagaError::TransferSubmissionFailed(_) => FailureKind::TransferSubmissionFailed,
            SagaError::CheckoutCompletionFailed(_) => FailureKind::CheckoutCompletionFailed,
            SagaError::OrderNotCreated { .. } => FailureKind::OrderNotCreated,
            SagaError::TimedOut { step } => step.failure_kind(),
        }
    }

    /// The lower-level kind behind [`kind`](Self::kind), if there is one.
    pub fn cause(&self) -> Option<FailureKind> {
        match self {
            SagaError::PaymentAuthorizationFailed { errors } if errors.is_empty() => {
                Some(FailureKind::Transport)
            }
            SagaError::TransferSubmissionFailed(e) => Some(transfer_cause(e)),
            SagaError::CheckoutCompletionFailed(_) => Some(FailureKind::Transport),
            SagaError::TimedOut { .. } => Some(FailureKind::TimedOut),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SagaError::PaymentAuthorizationFailed { errors }
            | SagaError::OrderNotCreated { errors } => errors.as_slice(),
            _ => &[],
        }
    }

    pub fn to_failure(&self) -> FinalizeFailure {
        FinalizeFailure {
            reason: self.kind(),
            cause: self.cause(),
            message: self.to_string(),
            errors: self.field_errors().to_vec(),
        }
    }
}

impl From<CompletionError> for SagaError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Transport(e) => SagaError::CheckoutCompletionFailed(e),
            CompletionError::Rejected { errors } => SagaError::OrderNotCreated { errors },
        }
    }
}

fn transfer_cause(err: &TransferError) -> FailureKind {
    match err {
        TransferError::NotConnected => FailureKind::NotConnected,
        TransferError::WrongNetwork { .. } => FailureKind::WrongNetwork,
        TransferError::InvalidAmount(_) => FailureKind::InvalidAmount,
        TransferError::WalletUnavailable(_) => FailureKind::WalletUnavailable,
        TransferError::UserRejected => FailureKind::UserRejected,
        TransferError::InsufficientFunds(_) => FailureKind::InsufficientFunds,
        TransferError::Reverted(_) | TransferError::ConfirmationTimeout { .. } => {
            FailureKind::TransferNotConfirmed
        }
        TransferError::Provider(ProviderError::Request(_)) => FailureKind::Transport,
        TransferError::InvalidSigner(_) | TransferError::Provider(_) => FailureKind::ProviderError,
    }
}
