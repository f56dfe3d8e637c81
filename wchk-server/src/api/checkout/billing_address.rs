use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use wchk_sdk::objects::{Address, BillingAddressUpdateResponse, CheckoutToken};

use super::CheckoutApiError;
use crate::state::AppState;

/// `PUT /checkouts/{token}/billing-address` — forward the collected
/// billing address to the backend.
///
/// Field-level rejections are returned with `200 OK` so the form can show
/// them next to the offending inputs.
pub(super) async fn update_billing_address(
    state: State<AppState>,
    Path(token): Path<CheckoutToken>,
    Json(address): Json<Address>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let errors = state
        .backend
        .update_billing_address(&token, &address)
        .await
        .map_err(CheckoutApiError::Backend)?;

    if !errors.is_empty() {
        tracing::info!(checkout_token = %token, count = errors.len(), "Billing address rejected");
    }
    Ok(Json(BillingAddressUpdateResponse { errors }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{body_json, spawn_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use wchk_core::testing::REQUIRED_CHAIN;
    use wchk_sdk::objects::{BillingAddressUpdateResponse, FieldError};

    const ADDRESS: &str = r#"{
        "first_name": "Jan",
        "last_name": "Kowalski",
        "street_address1": "Marszalkowska 1",
        "city": "Warszawa",
        "postal_code": "00-001",
        "country": "PL",
        "phone": "+48 600 000 000"
    }"#;

    fn put_address(body: &str) -> Request<Body> {
        Request::put("/api/v1/checkouts/T1/billing-address")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_address_is_forwarded() {
        let app = spawn_app(REQUIRED_CHAIN);
        let response = app.send(put_address(ADDRESS)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: BillingAddressUpdateResponse = body_json(response).await;
        assert!(body.errors.is_empty());
        let forwarded = app.backend.addresses();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].city, "Warszawa");
        assert_eq!(forwarded[0].country, "PL");
    }

    #[tokio::test]
    async fn test_field_errors_are_returned() {
        let app = spawn_app(REQUIRED_CHAIN);
        app.backend.update(|s| {
            s.address_errors = vec![FieldError {
                field: Some("postalCode".into()),
                message: Some("This value is not valid for the address.".into()),
            }]
        });

        let response = app.send(put_address(ADDRESS)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: BillingAddressUpdateResponse = body_json(response).await;
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].field.as_deref(), Some("postalCode"));
    }

    #[tokio::test]
    async fn test_malformed_address_is_rejected() {
        let app = spawn_app(REQUIRED_CHAIN);
        let response = app.send(put_address(r#"{"city": "Warszawa"}"#)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(app.backend.addresses().is_empty());
    }
}
