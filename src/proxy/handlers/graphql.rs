// GraphQL Handler
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::graphql::{Credential, GraphQLRequest, GraphQLResponse};
use crate::proxy::credential::resolve_credential;
use crate::proxy::error::ProxyError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::UpstreamError;

/// Body accepted on `POST /graphql`
#[derive(Debug)]
struct ProxyPayload {
    request: GraphQLRequest,
    api_key: Option<String>,
}

/// Relay a GraphQL call upstream with the resolved credential.
///
/// The upstream status and body are returned as received; only requests that
/// never reach upstream produce a gateway-generated error.
pub async fn handle_graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let payload = parse_payload(&body)?;

    let credential = resolve_credential(
        &state.config.credential_sources,
        payload.api_key.as_deref(),
        &headers,
        state.config.default_credential(),
    )
    .filter(|key| !key.is_blank())
    .ok_or_else(|| {
        debug!("Rejected GraphQL request without usable API key");
        ProxyError::CredentialMissing
    })?;

    let request = payload.request;
    if request.query.trim().is_empty() {
        return Err(ProxyError::MissingQuery);
    }

    info!(
        "Received GraphQL request ({} bytes, {} variables)",
        request.query.len(),
        request.variables.len()
    );

    let upstream = forward(&state, &credential, &request).await?;
    let status = StatusCode::from_u16(upstream.status_code).unwrap_or(StatusCode::BAD_GATEWAY);

    info!("Upstream responded {}", status);
    Ok((status, Json(upstream.body)).into_response())
}

async fn forward(
    state: &AppState,
    credential: &Credential,
    request: &GraphQLRequest,
) -> Result<GraphQLResponse, ProxyError> {
    state
        .upstream
        .forward(credential, request)
        .await
        .map_err(|e| {
            warn!("Upstream call failed: {}", e);
            match e {
                UpstreamError::InvalidCredential => ProxyError::InvalidCredential,
                UpstreamError::Timeout => ProxyError::UpstreamTimeout,
                UpstreamError::Unreachable(msg) => ProxyError::UpstreamUnreachable(msg),
            }
        })
}

fn parse_payload(body: &[u8]) -> Result<ProxyPayload, ProxyError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ProxyError::MalformedBody(e.to_string()))?;

    let Value::Object(mut fields) = value else {
        return Err(ProxyError::MalformedBody("expected a JSON object".to_string()));
    };

    let query = match fields.remove("query") {
        Some(Value::String(query)) => query,
        Some(Value::Null) | None => String::new(),
        Some(_) => return Err(ProxyError::MalformedBody("query must be a string".to_string())),
    };

    let variables = match fields.remove("variables") {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(_) => return Err(ProxyError::InvalidVariables),
    };

    let api_key = match fields.remove("apiKey") {
        Some(Value::String(key)) => Some(key),
        Some(Value::Null) | None => None,
        Some(_) => return Err(ProxyError::MalformedBody("apiKey must be a string".to_string())),
    };

    Ok(ProxyPayload {
        request: GraphQLRequest::new(query).with_variables(variables),
        api_key,
    })
}
