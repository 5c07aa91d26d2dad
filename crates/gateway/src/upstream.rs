use thiserror::Error;
use tracing::debug;

/// Raw upstream answer. Classification happens in the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// One authenticated GET against the secondary API.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, path: &str, api_key: &str) -> Result<UpstreamResponse, TransportError>;
}

/// reqwest-backed transport. Timeouts come from the shared client.
pub struct HttpUpstream {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait::async_trait]
impl Upstream for HttpUpstream {
    async fn get(&self, path: &str, api_key: &str) -> Result<UpstreamResponse, TransportError> {
        let url = self.url_for(path);
        debug!(url = %url, "secondary API request");

        let resp = self
            .client
            .get(&url)
            .header("X-API-KEY", api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(format!("read body: {e}")))?;

        Ok(UpstreamResponse { status, body })
    }
}
