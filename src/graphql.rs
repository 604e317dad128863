//! GraphQL wire types shared by the gateway and the session controller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single GraphQL call: query text plus variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// Status code and decoded body of a GraphQL call, relayed unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLResponse {
    pub status_code: u16,
    pub body: Value,
}

impl GraphQLResponse {
    pub fn new(status_code: u16, body: Value) -> Self {
        Self { status_code, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Whether the body carries a non-null `errors` field. An empty array
    /// still counts: GraphQL only omits the field on success.
    pub fn has_errors(&self) -> bool {
        !matches!(self.body.get("errors"), None | Some(Value::Null))
    }

    /// Messages of the GraphQL `errors` array.
    ///
    /// Empty when `errors` is absent, null or an empty array. Entries without
    /// a `message` string are reported by their JSON text so that a non-empty
    /// `errors` array always yields at least one message.
    pub fn error_messages(&self) -> Vec<String> {
        match self.body.get("errors") {
            Some(Value::Array(errors)) => errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.to_string()],
        }
    }
}

/// Opaque API key forwarded to the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}
