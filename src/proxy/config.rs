use serde::{Deserialize, Serialize};

pub const DEFAULT_UPSTREAM_URL: &str = "https://flexhire.com/api/v2";
pub const DEFAULT_UPSTREAM_KEY_HEADER: &str = "FLEXHIRE-API-KEY";

/// Where the gateway may find the caller's credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `apiKey` field of the JSON body
    Body,
    /// `Authorization` header, raw or `Bearer <key>`
    Header,
    /// `default_api_key` from configuration
    Default,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Allow LAN access
    /// - false: bind 127.0.0.1 only (default)
    /// - true: bind 0.0.0.0
    pub allow_lan_access: bool,

    /// Listen port
    pub port: u16,

    /// Upstream GraphQL endpoint
    pub upstream_url: String,

    /// Header name carrying the credential on upstream calls
    pub upstream_key_header: String,

    /// Credential used when the caller supplies none. Never compiled in;
    /// comes from the config file or `FLEXHIRE_API_KEY`.
    pub default_api_key: Option<String>,

    /// Credential resolution order; the first source that is present wins
    pub credential_sources: Vec<CredentialSource>,

    /// Upstream request timeout (seconds)
    pub request_timeout: u64,

    /// Maximum accepted request body size (bytes)
    pub max_body_bytes: usize,

    /// Outbound proxy for upstream calls
    pub upstream_proxy: UpstreamProxyConfig,
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// Enabled
    pub enabled: bool,
    /// Proxy URL (http://, https://, socks5://)
    pub url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: 8045,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_key_header: DEFAULT_UPSTREAM_KEY_HEADER.to_string(),
            default_api_key: None,
            credential_sources: vec![
                CredentialSource::Body,
                CredentialSource::Header,
                CredentialSource::Default,
            ],
            request_timeout: 60,
            max_body_bytes: 1024 * 1024,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Get the actual listen address
    /// - allow_lan_access = false: "127.0.0.1"
    /// - allow_lan_access = true: "0.0.0.0"
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Default credential, ignoring an empty configured value
    pub fn default_credential(&self) -> Option<&str> {
        self.default_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
