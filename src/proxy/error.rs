use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures the gateway answers itself instead of relaying from upstream
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("API key is required")]
    CredentialMissing,

    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),

    #[error("query is required")]
    MissingQuery,

    #[error("variables must be a JSON object")]
    InvalidVariables,

    #[error("API key contains characters that cannot be sent in a header")]
    InvalidCredential,

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream request timed out")]
    UpstreamTimeout,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::CredentialMissing => StatusCode::UNAUTHORIZED,
            ProxyError::MalformedBody(_)
            | ProxyError::MissingQuery
            | ProxyError::InvalidVariables
            | ProxyError::InvalidCredential => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
