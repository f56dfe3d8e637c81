use serde::{Deserialize, Serialize};

/// A validated shipping/billing address.
///
/// Field validation happens in the address-collecting frontend; the
/// finalizer only forwards the value to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company_name: String,
    pub street_address1: String,
    #[serde(default)]
    pub street_address2: String,
    pub city: String,
    #[serde(default)]
    pub city_area: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default)]
    pub country_area: String,
    #[serde(default)]
    pub phone: String,
}
