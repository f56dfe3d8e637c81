//! Checkout-side objects: the snapshot the saga runs against and the
//! transient results each saga step produces.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::Address;

/// Opaque identifier correlating every backend operation of one
/// in-progress order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutToken(pub String);

impl CheckoutToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-assigned identifier of a created order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

/// Read-only view of a checkout, supplied once per saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSnapshot {
    pub token: CheckoutToken,
    /// Gross total the customer pays.
    pub total_price: Money,
    #[serde(default)]
    pub billing_address: Option<Address>,
}

/// A field-level error reported by the backend.
///
/// `field` names the offending input (usually an address field) and is
/// absent for errors that apply to the request as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message.as_deref().unwrap_or("invalid value");
        match &self.field {
            Some(field) => write!(f, "{field}: {message}"),
            None => f.write_str(message),
        }
    }
}

/// Outcome of registering a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResult {
    pub accepted: bool,
    pub errors: Vec<FieldError>,
}

impl PaymentIntentResult {
    /// Build a result from the backend's error list; an empty list means
    /// the intent was registered.
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            accepted: errors.is_empty(),
            errors,
        }
    }

    /// The backend could not be reached or failed outright.
    pub fn unreachable() -> Self {
        Self {
            accepted: false,
            errors: Vec::new(),
        }
    }
}

/// Result of handing a transfer to the wallet for signing.
///
/// `submitted` is the success boundary; confirmation depth is not implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub submitted: bool,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReference {
    pub created: bool,
    pub order_id: Option<OrderId>,
}

impl OrderReference {
    pub fn from_order_id(order_id: Option<OrderId>) -> Self {
        Self {
            created: order_id.is_some(),
            order_id,
        }
    }
}

/// Response of `PUT /checkouts/{token}/billing-address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddressUpdateResponse {
    pub errors: Vec<FieldError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_intent_result_from_errors() {
        assert!(PaymentIntentResult::from_errors(vec![]).accepted);

        let rejected = PaymentIntentResult::from_errors(vec![FieldError {
            field: Some("amount".into()),
            message: Some("Partial payments are not allowed".into()),
        }]);
        assert!(!rejected.accepted);
        assert_eq!(rejected.errors.len(), 1);

        let unreachable = PaymentIntentResult::unreachable();
        assert!(!unreachable.accepted);
        assert!(unreachable.errors.is_empty());
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError {
            field: Some("postalCode".into()),
            message: Some("This value is not valid for the address.".into()),
        };
        assert_eq!(
            err.to_string(),
            "postalCode: This value is not valid for the address."
        );
        let bare = FieldError {
            field: None,
            message: None,
        };
        assert_eq!(bare.to_string(), "invalid value");
    }

    #[test]
    fn test_snapshot_amount_keeps_precision() {
        let json = r#"{
            "token": "T1",
            "total_price": { "amount": "100.00", "currency": "HF" }
        }"#;
        let snapshot: CheckoutSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.token.as_str(), "T1");
        assert_eq!(snapshot.total_price.amount.to_string(), "100.00");
        assert!(snapshot.billing_address.is_none());
    }
}
