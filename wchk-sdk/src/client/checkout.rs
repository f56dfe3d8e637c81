//! Client for the server API (checkout frontend → finalizer server).

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::{Client, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::ClientError;
use crate::objects::{
    Address, BillingAddressUpdateResponse, CheckoutSnapshot, CheckoutToken, FinalizeOutcome,
    WalletSnapshot, WsServerMessage,
};

/// Typed client for the finalizer server.
///
/// `finalize` is the single business entry point; the other calls expose
/// wallet state and the address-collection glue.
#[derive(Debug, Clone)]
pub struct CheckoutClient {
    http: Client,
    base_url: Url,
}

impl CheckoutClient {
    /// Create a new `CheckoutClient` for the server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/wallet` – current wallet snapshot.
    pub async fn wallet(&self) -> Result<WalletSnapshot, ClientError> {
        let url = self.base_url.join("/api/v1/wallet")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/wallet/connect` – ask the wallet for account access.
    pub async fn connect_wallet(&self) -> Result<WalletSnapshot, ClientError> {
        let url = self.base_url.join("/api/v1/wallet/connect")?;
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/checkouts/{token}` – checkout snapshot as the backend
    /// currently reports it.
    pub async fn checkout(&self, token: &CheckoutToken) -> Result<CheckoutSnapshot, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkouts/{}", token.as_str()))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `PUT /api/v1/checkouts/{token}/billing-address`.
    pub async fn update_billing_address(
        &self,
        token: &CheckoutToken,
        address: &Address,
    ) -> Result<BillingAddressUpdateResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkouts/{}/billing-address", token.as_str()))?;
        let resp = self.http.put(url).json(address).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/checkouts/{token}/finalize` – run the finalization saga.
    ///
    /// Saga failures are not transport errors: they come back as
    /// [`FinalizeOutcome::Failure`].
    pub async fn finalize(&self, token: &CheckoutToken) -> Result<FinalizeOutcome, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkouts/{}/finalize", token.as_str()))?;
        let resp = self.http.post(url).send().await?;

        let status = resp.status();
        if status.is_success()
            || status == StatusCode::NOT_FOUND
            || status == StatusCode::CONFLICT
            || status == StatusCode::UNPROCESSABLE_ENTITY
        {
            let bytes = resp.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(ClientError::Json);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ClientError::Api { status, body })
    }

    /// `GET /api/v1/wallet/ws` – stream of wallet snapshots.
    pub async fn wallet_updates(
        &self,
    ) -> Result<BoxStream<'static, Result<WsServerMessage, ClientError>>, ClientError> {
        self.subscribe("/api/v1/wallet/ws").await
    }

    /// `GET /api/v1/checkouts/{token}/ws` – saga progress for one checkout.
    pub async fn saga_progress(
        &self,
        token: &CheckoutToken,
    ) -> Result<BoxStream<'static, Result<WsServerMessage, ClientError>>, ClientError> {
        self.subscribe(&format!("/api/v1/checkouts/{}/ws", token.as_str()))
            .await
    }

    async fn subscribe(
        &self,
        path: &str,
    ) -> Result<BoxStream<'static, Result<WsServerMessage, ClientError>>, ClientError> {
        let mut url = self.base_url.join(path)?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;

        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;

        let frames = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => {
                    Some(serde_json::from_str::<WsServerMessage>(&text).map_err(ClientError::Json))
                }
                Ok(_) => None,
                Err(e) => Some(Err(ClientError::WebSocket(e))),
            }
        });
        Ok(frames.boxed())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
