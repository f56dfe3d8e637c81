pub mod address;
pub mod checkout;
pub mod finalize;
pub mod wallet;
pub mod ws;

pub use address::Address;
pub use checkout::{
    BillingAddressUpdateResponse, CheckoutSnapshot, CheckoutToken, FieldError, Money, OrderId,
    OrderReference, PaymentIntentResult, TransferReceipt,
};
pub use finalize::{FailureKind, FinalizeFailure, FinalizeOutcome};
pub use wallet::{ChainId, ChainIdParseError, WalletSession, WalletSnapshot, WalletState};
pub use ws::{SagaProgress, SagaStage, WsCloseCode, WsServerMessage};
