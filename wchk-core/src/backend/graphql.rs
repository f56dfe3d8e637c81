//! [`CheckoutBackend`] over a Saleor-style GraphQL API.

use super::{BackendError, CheckoutBackend, CompletionResponse, PaymentIntentRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;
use wchk_sdk::objects::{
    Address, CheckoutSnapshot, CheckoutToken, FieldError, Money, OrderId,
};

use crate::config::BackendConfig;

const CHECKOUT_QUERY: &str = r#"
query Checkout($token: UUID!) {
  checkout(token: $token) {
    token
    totalPrice { gross { amount currency } }
    billingAddress {
      firstName lastName companyName streetAddress1 streetAddress2
      city cityArea postalCode country { code } countryArea phone
    }
  }
}"#;

const PAYMENT_CREATE_MUTATION: &str = r#"
mutation CheckoutPaymentCreate($checkoutToken: UUID!, $paymentInput: PaymentInput!) {
  checkoutPaymentCreate(token: $checkoutToken, input: $paymentInput) {
    errors { field message }
  }
}"#;

const COMPLETE_MUTATION: &str = r#"
mutation CheckoutComplete($checkoutToken: UUID!) {
  checkoutComplete(token: $checkoutToken) {
    order { id }
    errors { field message }
  }
}"#;

const BILLING_ADDRESS_MUTATION: &str = r#"
mutation CheckoutBillingAddressUpdate($token: UUID!, $address: AddressInput!) {
  checkoutBillingAddressUpdate(token: $token, billingAddress: $address) {
    errors { field message }
  }
}"#;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MutationErrors {
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutData {
    checkout: Option<CheckoutNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutNode {
    token: String,
    total_price: Option<TaxedMoney>,
    billing_address: Option<AddressNode>,
}

#[derive(Debug, Deserialize)]
struct TaxedMoney {
    gross: MoneyNode,
}

#[derive(Debug, Deserialize)]
struct MoneyNode {
    #[serde(deserialize_with = "decimal_from_number")]
    amount: Decimal,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct CountryNode {
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressNode {
    first_name: String,
    last_name: String,
    #[serde(default)]
    company_name: String,
    street_address1: String,
    #[serde(default)]
    street_address2: String,
    city: String,
    #[serde(default)]
    city_area: String,
    postal_code: String,
    country: CountryNode,
    #[serde(default)]
    country_area: String,
    #[serde(default)]
    phone: Option<String>,
}

impl From<AddressNode> for Address {
    fn from(node: AddressNode) -> Self {
        Address {
            first_name: node.first_name,
            last_name: node.last_name,
            company_name: node.company_name,
            street_address1: node.street_address1,
            street_address2: node.street_address2,
            city: node.city,
            city_area: node.city_area,
            postal_code: node.postal_code,
            country: node.country.code,
            country_area: node.country_area,
            phone: node.phone.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressInput<'a> {
    first_name: &'a str,
    last_name: &'a str,
    company_name: &'a str,
    street_address1: &'a str,
    street_address2: &'a str,
    city: &'a str,
    city_area: &'a str,
    postal_code: &'a str,
    country: &'a str,
    country_area: &'a str,
    phone: &'a str,
}

impl<'a> From<&'a Address> for AddressInput<'a> {
    fn from(a: &'a Address) -> Self {
        AddressInput {
            first_name: &a.first_name,
            last_name: &a.last_name,
            company_name: &a.company_name,
            street_address1: &a.street_address1,
            street_address2: &a.street_address2,
            city: &a.city,
            city_area: &a.city_area,
            postal_code: &a.postal_code,
            country: &a.country,
            country_area: &a.country_area,
            phone: &a.phone,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCreateData {
    checkout_payment_create: Option<MutationErrors>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteData {
    checkout_complete: Option<CompleteNode>,
}

#[derive(Debug, Deserialize)]
struct CompleteNode {
    order: Option<OrderNode>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
struct OrderNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillingAddressData {
    checkout_billing_address_update: Option<MutationErrors>,
}

/// GraphQL `Float`/`PositiveDecimal` values arrive as JSON numbers. Reading
/// them through their textual form keeps `100.00`-style amounts exact.
fn decimal_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(D::Error::custom)
}

// ---------------------------------------------------------------------------
// GraphqlCheckoutBackend
// ---------------------------------------------------------------------------

pub struct GraphqlCheckoutBackend {
    http: reqwest::Client,
    url: Url,
    auth_token: Option<String>,
}

impl GraphqlCheckoutBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<T, BackendError> {
        let mut request = self.http.post(self.url.clone()).json(&json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        }));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlResponse<T> = response.json().await?;
        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BackendError::Graphql(message));
        }
        envelope
            .data
            .ok_or_else(|| BackendError::Parse(format!("{operation}: response has no data")))
    }
}

#[async_trait]
impl CheckoutBackend for GraphqlCheckoutBackend {
    #[tracing::instrument(skip_all, err, name = "GQL:Checkout", fields(checkout_token = %token))]
    async fn fetch_checkout(
        &self,
        token: &CheckoutToken,
    ) -> Result<Option<CheckoutSnapshot>, BackendError> {
        let data: CheckoutData = self
            .execute("Checkout", CHECKOUT_QUERY, json!({ "token": token }))
            .await?;
        let Some(node) = data.checkout else {
            debug!(checkout_token = %token, "Checkout not found");
            return Ok(None);
        };
        let total = node
            .total_price
            .ok_or_else(|| BackendError::Parse("checkout has no total price".into()))?
            .gross;

        Ok(Some(CheckoutSnapshot {
            token: CheckoutToken(node.token),
            total_price: Money {
                amount: total.amount,
                currency: total.currency,
            },
            billing_address: node.billing_address.map(Address::from),
        }))
    }

    #[tracing::instrument(skip_all, err, name = "GQL:CheckoutPaymentCreate", fields(checkout_token = %request.checkout_token))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<Vec<FieldError>, BackendError> {
        let mut payment_input = json!({
            "gateway": request.gateway,
            "amount": request.amount.to_string(),
        });
        if let Some(payment_token) = &request.payment_token {
            payment_input["token"] = json!(payment_token);
        }

        let data: PaymentCreateData = self
            .execute(
                "CheckoutPaymentCreate",
                PAYMENT_CREATE_MUTATION,
                json!({
                    "checkoutToken": request.checkout_token,
                    "paymentInput": payment_input,
                }),
            )
            .await?;
        data.checkout_payment_create
            .map(|payload| payload.errors)
            .ok_or_else(|| BackendError::Parse("checkoutPaymentCreate returned null".into()))
    }

    #[tracing::instrument(skip_all, err, name = "GQL:CheckoutComplete", fields(checkout_token = %token))]
    async fn complete_checkout(
        &self,
        token: &CheckoutToken,
    ) -> Result<CompletionResponse, BackendError> {
        let data: CompleteData = self
            .execute(
                "CheckoutComplete",
                COMPLETE_MUTATION,
                json!({ "checkoutToken": token }),
            )
            .await?;
        let Some(node) = data.checkout_complete else {
            warn!(checkout_token = %token, "checkoutComplete returned null");
            return Ok(CompletionResponse::default());
        };
        Ok(CompletionResponse {
            order_id: node.order.map(|order| OrderId(order.id)),
            errors: node.errors,
        })
    }

    #[tracing::instrument(skip_all, err, name = "GQL:CheckoutBillingAddressUpdate", fields(checkout_token = %token))]
    async fn update_billing_address(
        &self,
        token: &CheckoutToken,
        address: &Address,
    ) -> Result<Vec<FieldError>, BackendError> {
        let data: BillingAddressData = self
            .execute(
                "CheckoutBillingAddressUpdate",
                BILLING_ADDRESS_MUTATION,
                json!({
                    "token": token,
                    "address": AddressInput::from(address),
                }),
            )
            .await?;
        data.checkout_billing_address_update
            .map(|payload| payload.errors)
            .ok_or_else(|| {
                BackendError::Parse("checkoutBillingAddressUpdate returned null".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_response_keeps_exact_amount() {
        let body = r#"{
            "data": {
                "checkout": {
                    "token": "T1",
                    "totalPrice": { "gross": { "amount": 100.1, "currency": "HF" } },
                    "billingAddress": {
                        "firstName": "Ada", "lastName": "Lovelace",
                        "streetAddress1": "1 Main St", "city": "Warsaw",
                        "postalCode": "00-001", "country": { "code": "PL" },
                        "phone": null
                    }
                }
            }
        }"#;
        let response: GraphqlResponse<CheckoutData> = serde_json::from_str(body).unwrap();
        let node = response.data.unwrap().checkout.unwrap();
        let gross = node.total_price.unwrap().gross;
        assert_eq!(gross.amount, Decimal::from_str("100.1").unwrap());

        let address = Address::from(node.billing_address.unwrap());
        assert_eq!(address.country, "PL");
        assert_eq!(address.phone, "");
    }

    #[test]
    fn test_completion_without_order() {
        let body = r#"{
            "data": { "checkoutComplete": { "order": null, "errors": [] } }
        }"#;
        let response: GraphqlResponse<CompleteData> = serde_json::from_str(body).unwrap();
        let node = response.data.unwrap().checkout_complete.unwrap();
        assert!(node.order.is_none());
        assert!(node.errors.is_empty());
    }

    #[test]
    fn test_top_level_errors_parse() {
        let body = r#"{ "data": null, "errors": [{ "message": "Checkout not paid" }] }"#;
        let response: GraphqlResponse<CompleteData> = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "Checkout not paid");
    }

    #[test]
    fn test_address_input_is_camel_case() {
        let address = Address {
            first_name: "Ada".into(),
            street_address1: "1 Main St".into(),
            postal_code: "00-001".into(),
            country: "PL".into(),
            ..Address::default()
        };
        let value = serde_json::to_value(AddressInput::from(&address)).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["streetAddress1"], "1 Main St");
        assert_eq!(value["postalCode"], "00-001");
    }

    #[test]
    fn test_backend_builds_with_timeout() {
        let config = BackendConfig {
            url: Url::parse("http://127.0.0.1:8000/graphql/").unwrap(),
            auth_token: None,
            request_timeout: std::time::Duration::from_secs(10),
        };
        let backend = GraphqlCheckoutBackend::new(&config).unwrap();
        assert_eq!(backend.url, config.url);
    }
}
