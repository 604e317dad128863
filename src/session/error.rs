use std::time::Duration;
use thiserror::Error;

use crate::session::profile::ProfileError;

/// Failure classes surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable API key; fixed by supplying one
    CredentialMissing,
    /// Upstream said no: non-2xx status or a GraphQL `errors` array
    UpstreamRejected,
    /// Network error, timeout or a response that could not be understood
    TransportFailure,
    /// The gateway refused the request as malformed
    RequestMalformed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("API key required")]
    CredentialMissing,

    #[error("{}", rejection_message(.status, .messages))]
    UpstreamRejected { status: u16, messages: Vec<String> },

    #[error("Could not reach the server, please try again ({0})")]
    Transport(String),

    #[error("The server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Unexpected response from the server: {0}")]
    MalformedResponse(String),

    #[error("Request rejected by the gateway: {0}")]
    RequestMalformed(String),

    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Not allowed while {0}")]
    InvalidState(&'static str),
}

impl SessionError {
    /// Taxonomy class; `None` for control outcomes that are not failures of
    /// the call itself.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::CredentialMissing => Some(ErrorKind::CredentialMissing),
            SessionError::UpstreamRejected { .. } => Some(ErrorKind::UpstreamRejected),
            SessionError::Transport(_)
            | SessionError::Timeout(_)
            | SessionError::MalformedResponse(_) => Some(ErrorKind::TransportFailure),
            SessionError::RequestMalformed(_) => Some(ErrorKind::RequestMalformed),
            SessionError::Superseded | SessionError::InvalidState(_) => None,
        }
    }
}

impl From<ProfileError> for SessionError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NoCurrentUser | ProfileError::NoConfirmation => {
                SessionError::UpstreamRejected {
                    status: 200,
                    messages: vec![err.to_string()],
                }
            }
            ProfileError::MissingData | ProfileError::Shape(_) => {
                SessionError::MalformedResponse(err.to_string())
            }
        }
    }
}

fn rejection_message(status: &u16, messages: &[String]) -> String {
    if messages.is_empty() {
        format!("Request rejected (HTTP {})", status)
    } else {
        messages.join("; ")
    }
}
