use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{instrument, trace};

use super::{ConnectRequest, RelayApi, RelayStatus, ScanResponse, SendBatchRequest, SendRequest};
use crate::error::{BackendError, RelayCallError};

/// [`RelayApi`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    client: Client,
    base_url: String,
}

impl HttpRelayClient {
    /// Creates a client rooted at `base_url` (for example `http://127.0.0.1:8080/api`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

async fn expect_success(response: Response) -> Result<Response, RelayCallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::RelayStatus {
        status: status.as_u16(),
        body,
    }
    .into())
}

async fn decode<R: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<R, RelayCallError> {
    let bytes = response.bytes().await.map_err(BackendError::from)?;
    trace!(endpoint, body = %String::from_utf8_lossy(&bytes), "relay response");
    serde_json::from_slice(&bytes).map_err(|source| RelayCallError::Malformed { endpoint, source })
}

fn request_failed(error: reqwest::Error) -> RelayCallError {
    BackendError::from(error).into()
}

#[async_trait]
impl RelayApi for HttpRelayClient {
    #[instrument(skip(self), level = "debug", fields(base_url = %self.base_url))]
    async fn health(&self, timeout: Duration) -> Result<(), RelayCallError> {
        let response = self
            .client
            .get(self.url("health"))
            .timeout(timeout)
            .send()
            .await
            .map_err(request_failed)?;
        expect_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn scan(&self) -> Result<ScanResponse, RelayCallError> {
        let response = self
            .client
            .post(self.url("scan"))
            .send()
            .await
            .map_err(request_failed)?;
        decode("scan", expect_success(response).await?).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn connect(&self, request: &ConnectRequest) -> Result<RelayStatus, RelayCallError> {
        let response = self
            .client
            .post(self.url("connect"))
            .json(request)
            .send()
            .await
            .map_err(request_failed)?;
        decode("connect", expect_success(response).await?).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), RelayCallError> {
        let response = self
            .client
            .post(self.url("disconnect"))
            .send()
            .await
            .map_err(request_failed)?;
        expect_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    async fn status(&self) -> Result<RelayStatus, RelayCallError> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .map_err(request_failed)?;
        decode("status", expect_success(response).await?).await
    }

    #[instrument(skip(self, request), level = "debug", fields(with_response = request.with_response))]
    async fn send(&self, request: &SendRequest) -> Result<(), RelayCallError> {
        let response = self
            .client
            .post(self.url("send"))
            .json(request)
            .send()
            .await
            .map_err(request_failed)?;
        expect_success(response).await?;
        Ok(())
    }

    #[instrument(
        skip(self, request),
        level = "debug",
        fields(packets = request.packets.len(), with_response = request.with_response)
    )]
    async fn send_batch(&self, request: &SendBatchRequest) -> Result<(), RelayCallError> {
        let response = self
            .client
            .post(self.url("send-batch"))
            .json(request)
            .send()
            .await
            .map_err(request_failed)?;
        expect_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn url_joins_paths_without_doubled_slashes() {
        let client = HttpRelayClient::new("http://127.0.0.1:8080/api/");
        assert_eq!("http://127.0.0.1:8080/api/send-batch", client.url("send-batch"));
    }
}
