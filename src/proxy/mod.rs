// proxy module - GraphQL credential-forwarding gateway

pub mod config;
pub mod credential;
pub mod error;
pub mod handlers;   // API endpoint handlers
pub mod middleware; // Axum middleware
pub mod server;
pub mod upstream;   // Upstream client

pub use config::{CredentialSource, ProxyConfig};
pub use error::ProxyError;
pub use server::AxumServer;
pub use upstream::{UpstreamClient, UpstreamTransport};
