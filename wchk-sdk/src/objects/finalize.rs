//! Terminal outcome of a "finalize order" invocation.

use serde::{Deserialize, Serialize};

use super::checkout::{FieldError, OrderId};

/// Discriminated result returned to the UI layer.
///
/// ```json
/// {"status":"success","order_id":"T3JkZXI6MQ==","transaction_hash":"0xabc…"}
/// {"status":"failure","reason":"transfer_submission_failed","cause":"user_rejected","message":"…"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalizeOutcome {
    Success {
        order_id: OrderId,
        #[serde(default)]
        transaction_hash: Option<String>,
    },
    Failure(FinalizeFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeFailure {
    /// The saga-level kind the UI should display.
    pub reason: FailureKind,
    /// The lower-level kind that triggered `reason`, when more specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureKind>,
    pub message: String,
    /// Field errors returned by the backend, for display next to the
    /// address form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// Every distinguishable failure the finalizer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    WalletUnavailable,
    UserRejected,
    WrongNetwork,
    NotConnected,
    InvalidAmount,
    InsufficientFunds,
    ProviderError,
    Transport,
    PaymentAuthorizationFailed,
    TransferSubmissionFailed,
    TransferNotConfirmed,
    OrderNotCreated,
    CheckoutCompletionFailed,
    CheckoutNotFound,
    TimedOut,
    AlreadyInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_format() {
        let success = FinalizeOutcome::Success {
            order_id: OrderId("O1".into()),
            transaction_hash: Some("0xH1".into()),
        };
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["order_id"], "O1");

        let failure = FinalizeOutcome::Failure(FinalizeFailure {
            reason: FailureKind::TransferSubmissionFailed,
            cause: Some(FailureKind::UserRejected),
            message: "user rejected the request".into(),
            errors: vec![],
        });
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "transfer_submission_failed");
        assert_eq!(json["cause"], "user_rejected");
        assert!(json.get("errors").is_none());

        let back: FinalizeOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, failure);
    }
}
