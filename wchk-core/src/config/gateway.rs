/// Payment gateway the intent is registered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway identifier understood by the commerce backend, e.g.
    /// `mirumee.payments.dummy`.
    pub id: String,
    /// Opaque token forwarded with the payment input, if the gateway needs one.
    pub payment_token: Option<String>,
}
