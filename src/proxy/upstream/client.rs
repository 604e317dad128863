// Upstream client implementation
// Forwards GraphQL calls to the configured endpoint with the resolved credential

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Duration;

use crate::graphql::{Credential, GraphQLRequest, GraphQLResponse};
use crate::proxy::config::ProxyConfig;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("credential is not a valid header value")]
    InvalidCredential,

    #[error("upstream request timed out")]
    Timeout,

    #[error("{0}")]
    Unreachable(String),
}

/// Outbound side of the gateway
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Send `request` upstream carrying `credential` and return the status and
    /// decoded body as received, whatever the status.
    async fn forward(
        &self,
        credential: &Credential,
        request: &GraphQLRequest,
    ) -> Result<GraphQLResponse, UpstreamError>;
}

pub struct UpstreamClient {
    http_client: Client,
    endpoint: String,
    key_header: header::HeaderName,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, String> {
        let key_header = header::HeaderName::from_bytes(config.upstream_key_header.as_bytes())
            .map_err(|e| format!("Invalid upstream key header '{}': {}", config.upstream_key_header, e))?;

        let mut builder = Client::builder()
            // Connection reuse across proxied calls
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .user_agent(concat!("flexhire-gateway/", env!("CARGO_PKG_VERSION")));

        let proxy = &config.upstream_proxy;
        if proxy.enabled && !proxy.url.is_empty() {
            let outbound = reqwest::Proxy::all(&proxy.url)
                .map_err(|e| format!("Invalid upstream proxy '{}': {}", proxy.url, e))?;
            builder = builder.proxy(outbound);
            tracing::info!("UpstreamClient enabled proxy: {}", proxy.url);
        } else {
            builder = builder.no_proxy();
        }

        let http_client = builder
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            endpoint: config.upstream_url.clone(),
            key_header,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self, credential: &Credential) -> Result<header::HeaderMap, UpstreamError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let mut key = header::HeaderValue::from_str(credential.as_str())
            .map_err(|_| UpstreamError::InvalidCredential)?;
        key.set_sensitive(true);
        headers.insert(self.key_header.clone(), key);
        Ok(headers)
    }
}

/// Decode an upstream body. Non-JSON text is relayed as a JSON string.
/// Every relayed body is JSON: empty becomes `null`, non-JSON a string.
fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl UpstreamTransport for UpstreamClient {
    async fn forward(
        &self,
        credential: &Credential,
        request: &GraphQLRequest,
    ) -> Result<GraphQLResponse, UpstreamError> {
        let headers = self.build_headers(credential)?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        if status.is_success() {
            tracing::debug!("Upstream request succeeded | Endpoint: {} | Status: {}", self.endpoint, status);
        } else {
            tracing::warn!("Upstream returned {} at {}", status, self.endpoint);
        }

        Ok(GraphQLResponse::new(status.as_u16(), decode_body(text)))
    }
}

fn classify(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Unreachable(e.to_string())
    }
}
