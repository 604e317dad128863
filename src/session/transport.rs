//! Client side of the gateway: sends GraphQL calls and classifies results.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Duration;

use crate::graphql::{Credential, GraphQLRequest, GraphQLResponse};
use crate::session::error::SessionError;

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8045/graphql";

/// Message the gateway returns with 401 when no usable key was resolved
const CREDENTIAL_REQUIRED: &str = "API key is required";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Carries one GraphQL call to the gateway with exactly one credential
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn execute(
        &self,
        request: &GraphQLRequest,
        credential: &Credential,
    ) -> Result<GraphQLResponse, TransportError>;
}

/// reqwest implementation posting `{query, variables, apiKey}`
pub struct HttpGatewayClient {
    http_client: Client,
    endpoint: String,
}

impl HttpGatewayClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, String> {
        let endpoint = endpoint.into();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| format!("Invalid gateway URL '{}': {}", endpoint, e))?;

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("flexhire-session/", env!("CARGO_PKG_VERSION")));

        // A gateway on this machine is never reached through a system proxy
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }

        let http_client = builder
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }
}

fn is_loopback(url: &reqwest::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayClient {
    async fn execute(
        &self,
        request: &GraphQLRequest,
        credential: &Credential,
    ) -> Result<GraphQLResponse, TransportError> {
        let body = json!({
            "query": request.query,
            "variables": request.variables,
            "apiKey": credential.as_str(),
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            // Error pages from intermediaries are kept so the status can be reported
            Err(_) if !status.is_success() => Value::String(text),
            Err(e) => return Err(TransportError::Decode(e.to_string())),
        };

        tracing::debug!("Gateway responded {}", status);
        Ok(GraphQLResponse::new(status.as_u16(), body))
    }
}

/// Classify a gateway response, returning the body on success.
///
/// Any non-null GraphQL `errors` field, even an empty array, is a failure
/// regardless of the HTTP status. Error bodies produced by the gateway itself (`{"error": ...}`)
/// are mapped to the matching error class.
pub fn interpret_response(response: GraphQLResponse) -> Result<Value, SessionError> {
    if response.has_errors() {
        return Err(SessionError::UpstreamRejected {
            status: response.status_code,
            messages: response.error_messages(),
        });
    }

    if response.is_success() {
        return Ok(response.body);
    }

    let gateway_error = response
        .body
        .get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string);

    match (response.status_code, gateway_error) {
        (401, Some(msg)) if msg == CREDENTIAL_REQUIRED => Err(SessionError::CredentialMissing),
        (400, Some(msg)) => Err(SessionError::RequestMalformed(msg)),
        (502 | 504, Some(msg)) => Err(SessionError::Transport(msg)),
        (status, msg) => Err(SessionError::UpstreamRejected {
            status,
            messages: msg.into_iter().collect(),
        }),
    }
}
