use std::time::Duration;
use url::Url;

/// Connection settings for the commerce backend's GraphQL API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Url,
    /// Sent as a bearer token when present.
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}
