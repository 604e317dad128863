//! Credential resolution for incoming gateway requests.

use axum::http::{header, HeaderMap};

use crate::graphql::Credential;
use crate::proxy::config::CredentialSource;

/// Resolve at most one credential by walking `sources` in order.
///
/// The first source that is present wins, even when its value is blank: a
/// caller that sends an empty key is rejected rather than silently switched
/// to the configured default.
pub fn resolve_credential(
    sources: &[CredentialSource],
    body_key: Option<&str>,
    headers: &HeaderMap,
    default_key: Option<&str>,
) -> Option<Credential> {
    sources.iter().find_map(|source| match source {
        CredentialSource::Body => body_key.map(Credential::from),
        CredentialSource::Header => authorization_key(headers).map(Credential::from),
        CredentialSource::Default => default_key.map(Credential::from),
    })
}

/// Extract the key from an `Authorization` header (raw or `Bearer <key>`)
fn authorization_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();

    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => Some(rest.trim()),
        _ => Some(value),
    }
}
